mod obj;
mod stl;

use anyhow::Result;

use crate::mesh::Trimesh;

use crate::exchange::obj::ObjMesh;
use crate::exchange::stl::BinaryStl;

#[derive(Debug, Clone, PartialEq)]
// An enum to represent the different mesh file formats.
pub enum MeshFormat {
    // the STL format is a binary or ASCII format with a pure triangle soup
    STL,
    // the OBJ format, an ASCII format with a lot of extra junk
    OBJ,
    // the PLY format is a binary format with an ASCII header
    PLY,
}

impl MeshFormat {
    /// Convert a string to a MeshFormat enum.
    pub fn from_string(s: &str) -> Result<Self> {
        // clean up to match 'stl', '.stl', ' .STL ', etc
        let binding = s.to_ascii_lowercase();
        let clean = binding.trim().trim_start_matches('.').trim();
        match clean {
            "stl" => Ok(MeshFormat::STL),
            "obj" => Ok(MeshFormat::OBJ),
            "ply" => Ok(MeshFormat::PLY),
            _ => Err(anyhow::anyhow!("Unsupported file type: `{}`", clean)),
        }
    }
}

pub fn load_mesh(file_data: &[u8], file_type: MeshFormat) -> Result<Trimesh> {
    match file_type {
        MeshFormat::STL => BinaryStl::from_bytes(file_data)?.to_mesh(),
        MeshFormat::OBJ => ObjMesh::from_string(&String::from_utf8_lossy(file_data), false)?.to_mesh(),
        MeshFormat::PLY => todo!(),
    }
}
