//! Source text in, instrumented source text out.

use std::{collections::HashSet, path::Path};

use swc_core::{
    common::{
        comments::SingleThreadedComments, sync::Lrc, BytePos, FileName, SourceFile, SourceMap,
        Spanned,
    },
    ecma::{
        ast::{EsVersion, Ident, IdentName, Program},
        codegen::to_code_default,
        parser::{self, parse_file_as_program, EsSyntax, Syntax, TsSyntax},
        visit::{Visit, VisitWith},
    },
};
use tracing::debug;

use crate::{
    config::Config,
    error::Error,
    marks::strip_marks,
    preprocess::{Preprocessed, Preprocessor},
    transform::rewrite,
};

/// Preprocess, parse, instrument and re-print `source`.
///
/// `filename` only selects the parser dialect and appears in parse errors.
/// Comments are carried over to the output.
pub fn transform_source(source: &str, filename: &str, config: &Config) -> Result<String, Error> {
    let preprocessor = Preprocessor::new(config)?;
    let mut pre = preprocessor.run(source);
    let mut parsed = parse(&pre, filename)?;

    // Markers inside strings, comments or JSX text did not turn into
    // identifiers. Put them back as written and parse again.
    let literal = parsed.literal_markers(&pre);
    if !literal.is_empty() {
        debug!(count = literal.len(), "markers inside literal text left as written");
        pre = preprocessor.run_except(source, &literal);
        parsed = parse(&pre, filename)?;
    }

    let offsets = parsed.marker_offsets(&pre);
    let Parsed {
        cm,
        fm,
        comments,
        mut program,
    } = parsed;

    let marks = strip_marks(&mut program, &config.prefix, Some(&offsets));
    if let Some(span) = marks.dangling.first() {
        let (line, col) = pre.locate((span.lo - fm.start_pos).0 as usize);
        return Err(Error::DanglingMarker { line, col });
    }
    if marks.is_empty() {
        debug!(filename, "no markers");
    } else {
        rewrite(&mut program, config, marks);
    }

    Ok(to_code_default(cm, Some(&comments), &program))
}

pub(crate) struct Parsed {
    pub cm: Lrc<SourceMap>,
    pub fm: Lrc<SourceFile>,
    pub comments: SingleThreadedComments,
    pub program: Program,
}

impl Parsed {
    /// Positions in the parsed file where a marker prefix starts.
    pub fn marker_offsets(&self, pre: &Preprocessed) -> HashSet<BytePos> {
        pre.marker_offsets()
            .map(|out| self.fm.start_pos + BytePos(out as u32))
            .collect()
    }

    /// Original offsets of markers that do not start an identifier.
    fn literal_markers(&self, pre: &Preprocessed) -> HashSet<usize> {
        let mut starts = IdentStarts::default();
        self.program.visit_with(&mut starts);
        pre.markers()
            .filter(|(out, _)| !starts.0.contains(&(self.fm.start_pos + BytePos(*out as u32))))
            .map(|(_, orig)| orig)
            .collect()
    }
}

pub(crate) fn parse(pre: &Preprocessed, filename: &str) -> Result<Parsed, Error> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom(filename.to_string()).into(),
        pre.source.clone(),
    );
    let comments = SingleThreadedComments::default();
    let mut recovered = vec![];

    let program = parse_file_as_program(
        &fm,
        syntax_for(filename),
        EsVersion::latest(),
        Some(&comments),
        &mut recovered,
    );
    let parse_error = |err: parser::error::Error| {
        let (line, col) = pre.locate((err.span().lo - fm.start_pos).0 as usize);
        Error::Parse {
            file: filename.to_string(),
            line,
            col,
            message: err.kind().msg().to_string(),
        }
    };
    let program = program.map_err(parse_error)?;
    // Recovered errors still mean the marked source is not valid.
    if let Some(err) = recovered.into_iter().next() {
        return Err(parse_error(err));
    }

    Ok(Parsed {
        cm,
        fm,
        comments,
        program,
    })
}

fn syntax_for(filename: &str) -> Syntax {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "js" | "jsx" | "mjs" | "cjs" => Syntax::Es(EsSyntax {
            jsx: true,
            decorators: true,
            ..Default::default()
        }),
        "ts" | "mts" | "cts" => Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        }),
        _ => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
    }
}

#[derive(Default)]
struct IdentStarts(HashSet<BytePos>);

impl Visit for IdentStarts {
    fn visit_ident(&mut self, n: &Ident) {
        self.0.insert(n.span.lo);
    }

    fn visit_ident_name(&mut self, n: &IdentName) {
        self.0.insert(n.span.lo);
    }
}
