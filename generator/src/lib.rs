// rkc — Ragged Kernel Compiler
//
// Translates ragged-array kernel specification records into CUDA kernel
// source text plus host-callable launchers, and stamps out the numeric
// conversion boilerplate matrix.

pub mod ast;
pub mod codegen;
pub mod diag;
pub mod launch;
pub mod lexer;
pub mod matrix;
pub mod parser;
pub mod registry;
pub mod signature;
