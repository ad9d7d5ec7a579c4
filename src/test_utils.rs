use std::collections::HashSet;

use swc_core::{
    common::BytePos,
    ecma::{ast::Program, codegen::to_code},
};

use crate::{config::Config, pipeline, preprocess::Preprocessor};

/// Preprocess and parse `src` as TSX, returning the program and the
/// positions of the inserted marker prefixes.
pub fn parse(src: &str) -> (Program, HashSet<BytePos>) {
    let pre = Preprocessor::new(&Config::default()).unwrap().run(src);
    let parsed = pipeline::parse(&pre, "input.tsx").unwrap();
    let offsets = parsed.marker_offsets(&pre);
    (parsed.program, offsets)
}

pub fn print(program: &Program) -> String {
    to_code(program)
}
