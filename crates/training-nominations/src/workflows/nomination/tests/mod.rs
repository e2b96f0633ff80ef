mod common;
mod generator;
mod lifecycle;
