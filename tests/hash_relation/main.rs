mod concurrent;
mod handoff;
mod probe;
