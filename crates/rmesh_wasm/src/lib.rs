mod utils;

use wasm_bindgen::prelude::*;

use rmesh::exchange::{load_mesh, MeshFormat};
use rmesh::simplify::SimplifierConfig;
use rmesh_macro::wasm_result;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

#[wasm_bindgen]
pub fn load_mesh_ex(file_data: &[u8], file_type: &str) -> Result<String, String> {
    let mesh_format = MeshFormat::from_string(file_type).map_err(|e| e.to_string())?;
    let mesh = load_mesh(file_data, mesh_format).map_err(|e| e.to_string())?;
    // just print the debug info
    Ok(format!("{mesh:?}"))
}

/// Simplify a loaded mesh to (at most) `target_triangles` triangles and
/// re-encode it as a flat `[vertices..., face_count, faces...]` buffer of
/// doubles, so the caller doesn't need to understand our internal types.
#[wasm_result]
pub fn simplify_mesh(
    file_data: &[u8],
    file_type: &str,
    target_triangles: usize,
    aggressiveness: f64,
) -> Vec<f64> {
    let mesh_format = MeshFormat::from_string(file_type)?;
    let mesh = load_mesh(file_data, mesh_format)?;
    let config = SimplifierConfig {
        aggressiveness,
        ..Default::default()
    };
    let simplified = mesh
        .simplify(target_triangles, &config)
        .map_err(|e| anyhow::anyhow!(e))?;

    let mut flat: Vec<f64> = simplified
        .vertices
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .collect();
    flat.push(simplified.faces.len() as f64);
    flat.extend(
        simplified
            .faces
            .iter()
            .flat_map(|&(a, b, c)| [a as f64, b as f64, c as f64]),
    );
    Ok(flat)
}
