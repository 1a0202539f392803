use std::path::PathBuf;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "rollsync", "rollsync")
}

pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

pub fn shortcuts_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("shortcuts.json"))
}

pub fn projects_dir() -> Option<PathBuf> {
    let dirs = project_dirs()?;
    let p = dirs.data_dir().join("projects");
    let _ = std::fs::create_dir_all(&p);
    Some(p)
}

pub fn cache_dir() -> Option<PathBuf> {
    let dirs = project_dirs()?;
    let p = dirs.cache_dir().to_path_buf();
    let _ = std::fs::create_dir_all(&p);
    Some(p)
}
