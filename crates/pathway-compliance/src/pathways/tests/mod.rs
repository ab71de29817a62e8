mod common;

mod checklist;
mod classifier;
