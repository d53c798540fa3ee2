mod common;
mod exclusion;
