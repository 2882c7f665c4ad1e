//! Parses the line-oriented input format (§6): representation header,
//! linearity set, constraint matrix, optional inline symmetry group, and
//! optional inline Gram matrix.

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::BasilError;
use crate::gram::{self, GramMatrix, Metric};
use crate::group::{Permutation, PermGroup, SymmetryOracle};
use crate::index_set::IndexSet;
use crate::matrix::RationalMatrix;

/// Which kind of row the constraint matrix holds. Only `HRepresentation`
/// changes driver semantics today (the others are accepted and preserved
/// for round-tripping, matching `parse(pretty_print(parse(input))) ==
/// parse(input)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    H,
    V,
    A,
}

/// How the symmetry group is supplied.
#[derive(Debug, Clone)]
pub enum SymmetrySource {
    /// Computed from the Gram matrix at resolve time.
    Auto,
    /// Taken verbatim from the input as generator cycles.
    Explicit(Vec<Permutation>),
}

/// How the Gram matrix is supplied or derived.
#[derive(Debug, Clone)]
pub enum GramSource {
    None,
    Auto,
    Metric(Metric),
    /// An explicit `n x n` integer matrix given inline.
    Explicit(Vec<Vec<i64>>),
}

/// A fully parsed problem: everything the driver needs before it builds an
/// `LpKernel`.
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: Option<String>,
    pub representation: Representation,
    pub matrix: RationalMatrix,
    pub linearity: IndexSet,
    pub symmetry: SymmetrySource,
    pub gram: GramSource,
    pub comments: Vec<String>,
}

impl Problem {
    /// The metric the driver should feed into `build_gram`, resolving the
    /// `gram` keyword's `auto` default to `AugmentedQ`. Meaningless when
    /// `gram` is `Explicit`, since the inline matrix is used verbatim.
    pub fn gram_metric(&self) -> Metric {
        match &self.gram {
            GramSource::Metric(m) => *m,
            GramSource::Auto | GramSource::None | GramSource::Explicit(_) => Metric::AugmentedQ,
        }
    }

    /// Builds the Gram fingerprint for this problem: the inline matrix
    /// verbatim when `gram` is `Explicit`, otherwise the metric computed
    /// from the constraint matrix.
    pub fn build_gram(&self, signed_augment: bool) -> Result<GramMatrix, BasilError> {
        match &self.gram {
            GramSource::Explicit(labels) => GramMatrix::from_explicit(labels.clone()),
            _ => crate::gram::build_gram(&self.matrix, self.gram_metric(), signed_augment),
        }
    }

    /// Resolves the symmetry group to use for this run: an inline explicit
    /// group, or one computed from `gram` (the caller's already-built Gram
    /// fingerprint, honoring `gram_mode`).
    pub fn resolve_group(
        &self,
        gram: Option<&GramMatrix>,
        gram_mode: gram::Mode,
    ) -> Result<PermGroup, BasilError> {
        match &self.symmetry {
            SymmetrySource::Explicit(generators) => {
                Ok(PermGroup::from_generators(generators.clone(), self.matrix.nrows()))
            }
            SymmetrySource::Auto => match gram {
                Some(g) => Ok(SymmetryOracle::from_gram_matrix(g, gram_mode)),
                None => {
                    let built = self.build_gram(matches!(gram_mode, gram::Mode::Polytope))?;
                    Ok(SymmetryOracle::from_gram_matrix(&built, gram_mode))
                }
            },
        }
    }
}

/// Parses `input` per the §6 grammar. Lines starting with `*` or `#` are
/// comments, collected (in source order) into `Problem::comments` and
/// otherwise ignored by the grammar.
pub fn parse(input: &str) -> Result<Problem, BasilError> {
    let mut comments = Vec::new();
    let mut lines: Vec<(usize, &str)> = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('*') || line.starts_with('#') {
            comments.push(line.to_string());
            continue;
        }
        lines.push((i + 1, line));
    }

    let mut cursor = Cursor { lines: &lines, pos: 0 };

    let mut name = None;
    let mut representation = Representation::H;
    let mut linearity = IndexSet::empty();

    loop {
        let (lineno, tok) = cursor.peek_first_token()?;
        match tok.to_ascii_lowercase().as_str() {
            "h-representation" => {
                representation = Representation::H;
                cursor.advance();
            }
            "v-representation" => {
                representation = Representation::V;
                cursor.advance();
            }
            "a-representation" => {
                representation = Representation::A;
                cursor.advance();
            }
            "linearity" => {
                linearity = parse_linearity(&mut cursor)?;
            }
            "begin" => break,
            _ => {
                if name.is_none() {
                    name = Some(cursor.take_line()?.1.to_string());
                } else {
                    return Err(BasilError::Parse {
                        line: lineno,
                        message: format!("unexpected token `{tok}` before `begin`"),
                    });
                }
            }
        }
    }

    let matrix = parse_matrix_block(&mut cursor)?;
    let degree = matrix.nrows();

    let symmetry = if cursor.peek_keyword("symmetry")? {
        parse_symmetry(&mut cursor, degree)?
    } else {
        SymmetrySource::Auto
    };

    let gram = if cursor.peek_keyword("gram")? {
        parse_gram(&mut cursor)?
    } else {
        GramSource::None
    };

    Ok(Problem { name, representation, matrix, linearity, symmetry, gram, comments })
}

struct Cursor<'a> {
    lines: &'a [(usize, &'a str)],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_line(&mut self) -> Result<(usize, &'a str), BasilError> {
        let entry = self.lines.get(self.pos).copied().ok_or(BasilError::Parse {
            line: self.lines.last().map_or(0, |(n, _)| *n),
            message: "unexpected end of input".to_string(),
        })?;
        self.pos += 1;
        Ok(entry)
    }

    fn peek_first_token(&self) -> Result<(usize, &'a str), BasilError> {
        let (lineno, line) = self.lines.get(self.pos).copied().ok_or(BasilError::Parse {
            line: self.lines.last().map_or(0, |(n, _)| *n),
            message: "unexpected end of input".to_string(),
        })?;
        let tok = line.split_whitespace().next().unwrap_or(line);
        Ok((lineno, tok))
    }

    fn peek_keyword(&self, keyword: &str) -> Result<bool, BasilError> {
        Ok(self
            .lines
            .get(self.pos)
            .map(|(_, line)| {
                line.split_whitespace()
                    .next()
                    .map(|t| t.eq_ignore_ascii_case(keyword))
                    .unwrap_or(false)
            })
            .unwrap_or(false))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

fn parse_linearity(cursor: &mut Cursor) -> Result<IndexSet, BasilError> {
    let (lineno, line) = cursor.take_line()?;
    let mut parts = line.split_whitespace();
    parts.next(); // "linearity"
    let k: usize = parts
        .next()
        .ok_or(BasilError::Parse { line: lineno, message: "missing linearity count".to_string() })?
        .parse()
        .map_err(|_| BasilError::Parse {
            line: lineno,
            message: "linearity count must be an integer".to_string(),
        })?;
    let mut indices = Vec::with_capacity(k);
    for tok in parts {
        let idx: usize = tok.parse().map_err(|_| BasilError::Parse {
            line: lineno,
            message: format!("invalid linearity index `{tok}`"),
        })?;
        if idx == 0 {
            return Err(BasilError::Parse {
                line: lineno,
                message: "linearity indices are 1-indexed".to_string(),
            });
        }
        indices.push(idx - 1);
    }
    if indices.len() != k {
        return Err(BasilError::Parse {
            line: lineno,
            message: format!("expected {k} linearity indices, found {}", indices.len()),
        });
    }
    Ok(IndexSet::new(indices))
}

fn parse_matrix_block(cursor: &mut Cursor) -> Result<RationalMatrix, BasilError> {
    let (begin_line, begin_tok) = cursor.take_line()?;
    if !begin_tok.eq_ignore_ascii_case("begin") {
        return Err(BasilError::Parse {
            line: begin_line,
            message: format!("expected `begin`, found `{begin_tok}`"),
        });
    }

    let (dim_line, dim_line_text) = cursor.take_line()?;
    let mut dims = dim_line_text.split_whitespace();
    let n: usize = dims
        .next()
        .ok_or(BasilError::Parse { line: dim_line, message: "missing row count".to_string() })?
        .parse()
        .map_err(|_| BasilError::Parse { line: dim_line, message: "row count must be an integer".to_string() })?;
    let d: usize = dims
        .next()
        .ok_or(BasilError::Parse { line: dim_line, message: "missing column count".to_string() })?
        .parse()
        .map_err(|_| BasilError::Parse { line: dim_line, message: "column count must be an integer".to_string() })?;
    // The trailing "rational" token names the number format; only rationals
    // (and plain integers, a special case of rationals) are supported.

    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let (lineno, line) = cursor.take_line()?;
        let row: Vec<BigRational> = line
            .split_whitespace()
            .map(|tok| parse_rational(tok, lineno))
            .collect::<Result<_, _>>()?;
        if row.len() != d {
            return Err(BasilError::Parse {
                line: lineno,
                message: format!("expected {d} entries, found {}", row.len()),
            });
        }
        rows.push(row);
    }

    let (end_line, end_tok) = cursor.take_line()?;
    if !end_tok.eq_ignore_ascii_case("end") {
        return Err(BasilError::Parse {
            line: end_line,
            message: format!("expected `end`, found `{end_tok}`"),
        });
    }

    Ok(RationalMatrix::from_rows(rows))
}

fn parse_rational(tok: &str, lineno: usize) -> Result<BigRational, BasilError> {
    if let Some((n, d)) = tok.split_once('/') {
        let n: BigInt = n.parse().map_err(|_| BasilError::Parse {
            line: lineno,
            message: format!("invalid rational numerator `{n}`"),
        })?;
        let d: BigInt = d.parse().map_err(|_| BasilError::Parse {
            line: lineno,
            message: format!("invalid rational denominator `{d}`"),
        })?;
        Ok(BigRational::new(n, d))
    } else {
        let n: BigInt = tok.parse().map_err(|_| BasilError::Parse {
            line: lineno,
            message: format!("invalid number `{tok}`"),
        })?;
        Ok(BigRational::from_integer(n))
    }
}

fn parse_symmetry(cursor: &mut Cursor, degree: usize) -> Result<SymmetrySource, BasilError> {
    let (lineno, line) = cursor.take_line()?;
    let mut tokens = line.split_whitespace();
    tokens.next(); // "symmetry"
    match tokens.next() {
        Some(t) if t.eq_ignore_ascii_case("auto") => Ok(SymmetrySource::Auto),
        Some(t) if t.eq_ignore_ascii_case("begin") => {
            let mut generators = Vec::new();
            loop {
                let (lineno, line) = cursor.take_line()?;
                if line.eq_ignore_ascii_case("symmetry end") || line.eq_ignore_ascii_case("end") {
                    break;
                }
                generators.push(parse_cycle_line(line, lineno, degree)?);
            }
            Ok(SymmetrySource::Explicit(generators))
        }
        _ => Err(BasilError::Parse {
            line: lineno,
            message: "expected `symmetry auto` or `symmetry begin`".to_string(),
        }),
    }
}

/// Parses one generator's cycle notation: comma-separated cycles of
/// whitespace-separated 1-indexed elements, e.g. `1 2 3, 4 5`. Points not
/// named in any cycle are fixed points of a permutation of `degree`.
fn parse_cycle_line(line: &str, lineno: usize, degree: usize) -> Result<Permutation, BasilError> {
    let mut cycles: Vec<Vec<usize>> = Vec::new();
    for part in line.split(',') {
        let cycle: Vec<usize> = part
            .split_whitespace()
            .map(|tok| {
                let v: usize = tok.parse().map_err(|_| BasilError::Parse {
                    line: lineno,
                    message: format!("invalid cycle element `{tok}`"),
                })?;
                if v == 0 || v > degree {
                    return Err(BasilError::Parse {
                        line: lineno,
                        message: format!("cycle element `{v}` out of range for {degree} rows"),
                    });
                }
                Ok(v - 1)
            })
            .collect::<Result<_, BasilError>>()?;
        if !cycle.is_empty() {
            cycles.push(cycle);
        }
    }
    Ok(Permutation::from_cycles(degree, &cycles))
}

fn parse_gram(cursor: &mut Cursor) -> Result<GramSource, BasilError> {
    let (lineno, line) = cursor.take_line()?;
    let mut tokens = line.split_whitespace();
    tokens.next(); // "gram"
    match tokens.next() {
        None => Err(BasilError::Parse { line: lineno, message: "missing gram mode".to_string() }),
        Some(t) if t.eq_ignore_ascii_case("begin") => {
            let mut rows = Vec::new();
            loop {
                let (lineno, line) = cursor.take_line()?;
                if line.eq_ignore_ascii_case("gram end") || line.eq_ignore_ascii_case("end") {
                    break;
                }
                let row: Vec<i64> = line
                    .split_whitespace()
                    .map(|tok| {
                        tok.parse().map_err(|_| BasilError::Parse {
                            line: lineno,
                            message: format!("invalid gram entry `{tok}`"),
                        })
                    })
                    .collect::<Result<_, _>>()?;
                rows.push(row);
            }
            Ok(GramSource::Explicit(rows))
        }
        Some(t) if t.eq_ignore_ascii_case("none") => Ok(GramSource::None),
        Some(t) if t.eq_ignore_ascii_case("auto") => Ok(GramSource::Auto),
        Some(t) if t.eq_ignore_ascii_case("q") => Ok(GramSource::Metric(Metric::Q)),
        Some(t) if t.eq_ignore_ascii_case("no-augment") => Ok(GramSource::Metric(Metric::Raw)),
        Some(t) if t.eq_ignore_ascii_case("euclidean") => Ok(GramSource::Metric(Metric::Euclidean)),
        Some(t) if t.eq_ignore_ascii_case("no-norm") => Ok(GramSource::Metric(Metric::Raw)),
        Some(t) => Err(BasilError::Parse {
            line: lineno,
            message: format!("unknown gram mode `{t}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_square() {
        let input = "\
square
H-representation
begin
4 3 rational
0 1 0
1 -1 0
0 0 1
1 0 -1
end
";
        let problem = parse(input).unwrap();
        assert_eq!(problem.name.as_deref(), Some("square"));
        assert_eq!(problem.matrix.nrows(), 4);
        assert_eq!(problem.matrix.ncols(), 3);
        assert!(matches!(problem.symmetry, SymmetrySource::Auto));
    }

    #[test]
    fn test_parse_linearity_and_rational_entries() {
        let input = "\
H-representation
linearity 1 1
begin
2 2 rational
1/2 0
3 -1
end
";
        let problem = parse(input).unwrap();
        assert_eq!(problem.linearity, IndexSet::new([0]));
        assert_eq!(problem.matrix.get(0, 0), &BigRational::new(BigInt::from(1), BigInt::from(2)));
    }

    #[test]
    fn test_parse_explicit_symmetry_cycles() {
        let input = "\
H-representation
begin
2 2 rational
1 0
0 1
end
symmetry begin
1 2
symmetry end
";
        let problem = parse(input).unwrap();
        match &problem.symmetry {
            SymmetrySource::Explicit(gens) => {
                assert_eq!(gens.len(), 1);
                assert_eq!(gens[0].apply(0), 1);
            }
            SymmetrySource::Auto => panic!("expected explicit symmetry"),
        }
    }

    #[test]
    fn test_parse_gram_keyword() {
        let input = "\
H-representation
begin
1 1 rational
1
end
gram q
";
        let problem = parse(input).unwrap();
        assert!(matches!(problem.gram, GramSource::Metric(Metric::Q)));
    }

    #[test]
    fn test_parse_missing_end_is_parse_error() {
        let input = "\
H-representation
begin
1 1 rational
1
";
        assert!(matches!(parse(input), Err(BasilError::Parse { .. })));
    }
}
