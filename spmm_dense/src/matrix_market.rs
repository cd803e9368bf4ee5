use nom::{Finish, IResult};
use num_complex::Complex;
use num_integer::Integer;
use spmm_matrix::{Matrix, MatrixError, Pos, Shape};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Raw entries read from a file. Positions are zero-indexed but not yet
/// checked against `shape`, and may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct Triplets<T> {
    pub shape: Shape,
    pub entries: Vec<(Pos, T)>,
}

impl<T> Triplets<T> {
    pub fn into_matrix<M: Matrix<T>>(self) -> Result<M, MatrixError> {
        M::from_triplets(self.shape, self.entries)
    }
}

pub enum MatrixType<I, F> {
    Integer(Triplets<I>),
    Real(Triplets<F>),
    Complex(Triplets<Complex<F>>),
}

#[derive(Error, Debug)]
pub enum FromMatrixMarketError {
    #[error("parsing error")]
    Nom(#[from] nom::error::Error<String>),
    #[error("matrix market {0} matrices are unsupported")]
    Unsupported(String),
}

fn recognize_int(input: &str) -> IResult<&str, &str> {
    use nom::{
        character::complete::{char, digit1},
        combinator::{opt, recognize},
        sequence::pair,
    };
    recognize(pair(opt(char('-')), digit1))(input)
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    use nom::{character::complete::digit1, combinator::map_res};
    map_res(digit1, str::parse)(input)
}

// matrix market format is 1-indexed, but our matrices are 0-indexed
fn parse_index(input: &str) -> IResult<&str, usize> {
    use nom::combinator::map_opt;
    map_opt(parse_usize, |i| i.checked_sub(1))(input)
}

fn end_of_line(input: &str) -> IResult<&str, &str> {
    use nom::{
        branch::alt,
        character::complete::{line_ending, space0},
        combinator::eof,
        sequence::preceded,
    };
    preceded(space0, alt((line_ending, eof)))(input)
}

fn header(input: &str) -> IResult<&str, (&str, &str)> {
    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{char, line_ending, not_line_ending},
        multi::many0,
        sequence::{delimited, preceded},
    };

    let (input, _) = tag("%%MatrixMarket matrix coordinate")(input)?;
    let (input, field) = preceded(
        char(' '),
        alt((tag("integer"), tag("real"), tag("complex"), tag("pattern"))),
    )(input)?;
    let (input, symmetry) = delimited(
        char(' '),
        alt((
            tag("general"),
            tag("symmetric"),
            tag("skew-symmetric"),
            tag("hermitian"),
        )),
        end_of_line,
    )(input)?;
    // comments
    let (input, _) = many0(delimited(char('%'), not_line_ending, line_ending))(input)?;
    Ok((input, (field, symmetry)))
}

fn matrix_size(input: &str) -> IResult<&str, Shape> {
    use nom::{
        character::complete::{space0, space1},
        combinator::map,
        sequence::tuple,
    };
    map(
        tuple((
            space0,
            parse_usize,
            space1,
            parse_usize,
            space1,
            parse_usize,
            end_of_line,
        )),
        |(_, r, _, c, _, _, _)| (r, c),
    )(input)
}

fn entries<'a, T, P>(
    input: &'a str,
    value: P,
    symmetric: bool,
) -> IResult<&'a str, Vec<(Pos, T)>>
where
    T: Clone,
    P: FnMut(&'a str) -> IResult<&'a str, T>,
{
    use nom::{
        character::complete::{multispace0, space1},
        combinator::map,
        multi::fold_many0,
        sequence::{preceded, tuple},
    };
    fold_many0(
        map(
            tuple((
                preceded(multispace0, parse_index),
                space1,
                parse_index,
                value,
                end_of_line,
            )),
            |(r, _, c, t, _)| ((r, c), t),
        ),
        Vec::new,
        move |mut entries, ((r, c), t): (Pos, T)| {
            if symmetric && r != c {
                entries.push(((c, r), t.clone()));
            }
            entries.push(((r, c), t));
            entries
        },
    )(input)
}

/// Reads a matrix market coordinate file. Explicit zeros and repeated
/// entries are kept; building a matrix from the triplets sums them.
pub fn parse_matrix_market<I, F>(input: &str) -> Result<MatrixType<I, F>, FromMatrixMarketError>
where
    I: FromStr + Integer + Clone,
    F: FromStr + Clone,
{
    fn inner<I, F>(input: &str) -> IResult<&str, Result<MatrixType<I, F>, String>>
    where
        I: FromStr + Integer + Clone,
        F: FromStr + Clone,
    {
        use nom::{
            character::complete::space1,
            combinator::{map, map_res, success},
            number::complete::recognize_float,
            sequence::{preceded, tuple},
        };

        let (input, (field, symmetry)) = header(input)?;
        let symmetric = match symmetry {
            "general" => false,
            "symmetric" => true,
            _ => return Ok((input, Err(symmetry.to_string()))),
        };
        let (input, shape) = matrix_size(input)?;
        let real = || preceded(space1, map_res(recognize_float, str::parse::<F>));
        match field {
            "integer" => {
                let (input, entries) = entries(
                    input,
                    preceded(space1, map_res(recognize_int, str::parse::<I>)),
                    symmetric,
                )?;
                Ok((input, Ok(MatrixType::Integer(Triplets { shape, entries }))))
            }
            "pattern" => {
                let (input, entries) = entries(input, success(I::one()), symmetric)?;
                Ok((input, Ok(MatrixType::Integer(Triplets { shape, entries }))))
            }
            "real" => {
                let (input, entries) = entries(input, real(), symmetric)?;
                Ok((input, Ok(MatrixType::Real(Triplets { shape, entries }))))
            }
            _ => {
                let (input, entries) = entries(
                    input,
                    map(tuple((real(), real())), |(re, im)| Complex::new(re, im)),
                    symmetric,
                )?;
                Ok((input, Ok(MatrixType::Complex(Triplets { shape, entries }))))
            }
        }
    }

    let (rest, parsed) =
        inner(input)
            .finish()
            .map_err(|nom::error::Error { input, code }| nom::error::Error {
                input: input.to_string(),
                code,
            })?;
    let matrix = parsed.map_err(FromMatrixMarketError::Unsupported)?;
    if !rest.trim().is_empty() {
        return Err(FromMatrixMarketError::Nom(nom::error::Error {
            input: rest.to_string(),
            code: nom::error::ErrorKind::Eof,
        }));
    }
    Ok(matrix)
}

pub fn write_matrix_market<F: Display, W: std::fmt::Write>(
    triplets: &Triplets<F>,
    w: &mut W,
) -> Result<(), std::fmt::Error> {
    let (rows, cols) = triplets.shape;
    writeln!(w, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(w, "{} {} {}", rows, cols, triplets.entries.len())?;
    for ((i, j), t) in &triplets.entries {
        writeln!(w, "{} {} {}", i + 1, j + 1, t)?;
    }
    Ok(())
}
