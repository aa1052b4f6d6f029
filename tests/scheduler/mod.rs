mod failures;
mod refresh;
