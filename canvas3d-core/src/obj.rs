/// Wavefront OBJ parser producing de-indexed triangle meshes
use nom::{
    bytes::complete::take_till1,
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{all_consuming, opt},
    multi::many1,
    number::complete::float,
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MeshError;
use crate::geometry::Mesh;

/// One `v/vt/vn` reference of a face, still OBJ-indexed
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceRef {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn floats(input: &str) -> IResult<&str, Vec<f32>> {
    all_consuming(terminated(many1(preceded(space1, float)), space0))(input)
}

fn face_ref(input: &str) -> IResult<&str, FaceRef> {
    let (input, position) = integer(input)?;
    let (input, texcoord) = opt(preceded(char('/'), opt(integer)))(input)?;
    let (input, normal) = opt(preceded(char('/'), opt(integer)))(input)?;
    Ok((
        input,
        FaceRef {
            position,
            texcoord: texcoord.flatten(),
            normal: normal.flatten(),
        },
    ))
}

fn face(input: &str) -> IResult<&str, Vec<FaceRef>> {
    all_consuming(terminated(many1(preceded(space1, face_ref)), space0))(input)
}

fn syntax(line: usize, message: &str) -> MeshError {
    MeshError::Syntax {
        line,
        message: message.to_string(),
    }
}

/// Resolve a 1-based or negative (relative) OBJ index into `0..count`
fn resolve(index: i64, count: usize, line: usize) -> Result<usize, MeshError> {
    let resolved = if index > 0 { index - 1 } else { count as i64 + index };
    if index == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(MeshError::BadIndex { line, index });
    }
    Ok(resolved as usize)
}

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    mesh: Mesh,
    saw_texcoord: bool,
    saw_normal: bool,
}

impl ObjBuilder {
    fn push_vertex(&mut self, vertex: &FaceRef, line: usize) -> Result<(), MeshError> {
        let position = resolve(vertex.position, self.positions.len(), line)?;
        self.mesh.positions.push(self.positions[position]);

        let texcoord = match vertex.texcoord {
            Some(index) => {
                self.saw_texcoord = true;
                self.texcoords[resolve(index, self.texcoords.len(), line)?]
            }
            None => [0.0, 0.0],
        };
        self.mesh.texcoords.push(texcoord);

        let normal = match vertex.normal {
            Some(index) => {
                self.saw_normal = true;
                self.normals[resolve(index, self.normals.len(), line)?]
            }
            None => [0.0, 0.0, 0.0],
        };
        self.mesh.normals.push(normal);
        Ok(())
    }

    /// Fan-triangulate a polygon face
    fn push_face(&mut self, refs: &[FaceRef], line: usize) -> Result<(), MeshError> {
        if refs.len() < 3 {
            return Err(MeshError::DegenerateFace { line });
        }
        for i in 1..refs.len() - 1 {
            for vertex in [&refs[0], &refs[i], &refs[i + 1]] {
                self.push_vertex(vertex, line)?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Mesh {
        if !self.saw_texcoord {
            self.mesh.texcoords.clear();
        }
        if !self.saw_normal {
            self.mesh.normals.clear();
        }
        self.mesh
    }
}

/// Parse OBJ source text.
///
/// Supports `v`, `vt`, `vn` and `f` statements; groups, objects, smoothing
/// groups and material statements are ignored.
pub fn parse_obj(source: &str) -> Result<Mesh, MeshError> {
    let mut builder = ObjBuilder::default();

    for (number, raw) in source.lines().enumerate() {
        let line = number + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let (rest, key) = keyword(content).map_err(|_| syntax(line, "missing statement keyword"))?;

        match key {
            "v" => {
                let (_, values) = floats(rest).map_err(|_| syntax(line, "malformed vertex"))?;
                if values.len() < 3 {
                    return Err(syntax(line, "vertex needs three coordinates"));
                }
                builder.positions.push([values[0], values[1], values[2]]);
            }
            "vt" => {
                let (_, values) =
                    floats(rest).map_err(|_| syntax(line, "malformed texture coordinate"))?;
                builder
                    .texcoords
                    .push([values[0], values.get(1).copied().unwrap_or(0.0)]);
            }
            "vn" => {
                let (_, values) = floats(rest).map_err(|_| syntax(line, "malformed normal"))?;
                if values.len() < 3 {
                    return Err(syntax(line, "normal needs three components"));
                }
                builder.normals.push([values[0], values[1], values[2]]);
            }
            "f" => {
                let (_, refs) = face(rest).map_err(|_| syntax(line, "malformed face"))?;
                builder.push_face(&refs, line)?;
            }
            _ => {}
        }
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a textured quad
o quad
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0 0 1
usemtl default
s off
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_face_ref_forms() {
        let (_, r) = face_ref("3").unwrap();
        assert_eq!(r, FaceRef { position: 3, texcoord: None, normal: None });
        let (_, r) = face_ref("3/2").unwrap();
        assert_eq!(r, FaceRef { position: 3, texcoord: Some(2), normal: None });
        let (_, r) = face_ref("3//5").unwrap();
        assert_eq!(r, FaceRef { position: 3, texcoord: None, normal: Some(5) });
        let (_, r) = face_ref("-1/-2/-3").unwrap();
        assert_eq!(r, FaceRef { position: -1, texcoord: Some(-2), normal: Some(-3) });
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.has_texcoords());
        assert!(mesh.has_normals());
        assert_eq!(mesh.positions[3], [-1.0, -1.0, 0.0]);
        assert_eq!(mesh.positions[5], [-1.0, 1.0, 0.0]);
        assert_eq!(mesh.texcoords[4], [1.0, 1.0]);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_positions_only_and_negative_indices() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0 # trailing comment\nf -3 -2 -1\n";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert!(mesh.texcoords.is_empty());
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 9\n"),
            Err(MeshError::BadIndex { line: 3, index: 9 })
        );
        assert_eq!(
            parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n"),
            Err(MeshError::DegenerateFace { line: 3 })
        );
        assert!(matches!(
            parse_obj("v 0 zero 0\n"),
            Err(MeshError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nf 0 1 1\n"),
            Err(MeshError::BadIndex { line: 2, index: 0 })
        ));
    }
}
