mod harness;
mod tests;
