/// STL parser for binary and ASCII formats
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::MeshError;
use crate::geometry::Mesh;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One STL facet: a face normal and three corners
#[derive(Debug, Clone, Copy, PartialEq)]
struct Facet {
    normal: [f32; 3],
    corners: [[f32; 3]; 3],
}

fn facets_to_mesh(facets: Vec<Facet>) -> Mesh {
    let mut mesh = Mesh::with_capacity(facets.len() * 3);
    for facet in facets {
        for corner in facet.corners {
            mesh.positions.push(corner);
            mesh.normals.push(facet.normal);
        }
    }
    mesh
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, [x, y, z]))
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, normal) = binary_vector(input)?;
    let (input, (a, b, c)) = tuple((binary_vector, binary_vector, binary_vector))(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;
    Ok((
        input,
        Facet {
            normal,
            corners: [a, b, c],
        },
    ))
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(MeshError::TooSmall);
    }

    let body = &data[HEADER_LEN..];
    let (mut body, count) =
        le_u32::<_, nom::error::Error<&[u8]>>(body).map_err(|_| MeshError::TooSmall)?;
    let count = count as usize;

    let expected = count
        .checked_mul(FACET_LEN)
        .and_then(|facets| facets.checked_add(HEADER_LEN + 4))
        .unwrap_or(usize::MAX);
    if data.len() < expected {
        return Err(MeshError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let mut facets = Vec::with_capacity(count);
    for _ in 0..count {
        let (rest, facet) = binary_facet(body).map_err(|_| MeshError::Truncated {
            expected,
            actual: data.len(),
        })?;
        facets.push(facet);
        body = rest;
    }

    Ok(facets_to_mesh(facets))
}

fn ascii_vector(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, (x, _, y, _, z)) = preceded(
        multispace0,
        tuple((float, multispace1, float, multispace1, float)),
    )(input)?;
    Ok((input, [x, y, z]))
}

fn ascii_corner(input: &str) -> IResult<&str, [f32; 3]> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vector)(input)
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, (a, b, c)) = tuple((ascii_corner, ascii_corner, ascii_corner))(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((
        input,
        Facet {
            normal,
            corners: [a, b, c],
        },
    ))
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, facets))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, MeshError> {
    match ascii_solid(input) {
        Ok((_, facets)) => Ok(facets_to_mesh(facets)),
        Err(e) => Err(MeshError::Syntax {
            line: 0,
            message: format!("invalid ASCII STL: {e}"),
        }),
    }
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    // Binary files may also start with "solid", so fall back on failure
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}
