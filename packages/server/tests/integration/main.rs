
mod finalize;
mod phase;
