use log::debug;
use std::fs;
use std::path::Path;

/// Subdirectorios conocidos de la distribución de mecanismos de SDToolbox.
pub const MECHANISM_SUBDIRS: [&str; 3] = ["SanDiego", "NASA9", "Mevel2017"];

fn is_mechanism_file(name: &str) -> bool { name.ends_with(".cti") || name.ends_with(".yaml") }

fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries.filter_map(Result::ok)
           .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
           .filter_map(|e| e.file_name().into_string().ok())
           .filter(|n| is_mechanism_file(n))
           .collect()
}

/// Lista ordenada de mecanismos del directorio raíz y de sus subdirectorios
/// conocidos (éstos con prefijo `Sub/`). Un directorio inexistente da una
/// lista vacía.
pub fn scan_mechanisms(root: &Path) -> Vec<String> {
    let mut found = files_in(root);
    for sub in MECHANISM_SUBDIRS {
        found.extend(files_in(&root.join(sub)).into_iter().map(|f| format!("{sub}/{f}")));
    }
    found.sort();
    debug!("found {} mechanisms under {}", found.len(), root.display());
    found
}
