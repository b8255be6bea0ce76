//! Instruction execution handlers

mod arithmetic;
mod comparison;
mod control;
mod functions;
mod iterators;
mod output;
mod sequences;
mod variables;
