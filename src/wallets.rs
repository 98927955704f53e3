use alloy::signers::local::PrivateKeySigner;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeystoreDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl KeystoreDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_keystore_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_keystore_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_keystore_dir(),
    }
}

/// Keystore files in `dir`, sorted by name. `.json` extensions are dropped
/// from the name; files without an extension are listed as-is.
pub fn list_keystores(dir: &Path) -> Result<Vec<KeystoreDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut keystores = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.extension().and_then(|ext| ext.to_str()) {
            None => path.file_name(),
            Some("json") => path.file_stem(),
            Some(_) => continue,
        }
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
        .to_owned();
        keystores.push(KeystoreDescriptor::new(name, path));
    }
    keystores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(keystores)
}

pub fn find_keystore(dir: &Path, name: &str) -> Result<KeystoreDescriptor> {
    let keystores = list_keystores(dir)?;
    keystores
        .into_iter()
        .find(|k| k.name == name)
        .ok_or_else(|| eyre!("Keystore '{name}' not found in {}", dir.to_string_lossy()))
}

pub fn unlock_keystore(descriptor: &KeystoreDescriptor) -> Result<PrivateKeySigner> {
    let prompt = format!("Enter password for keystore '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read keystore password")?;
    decrypt_signer(descriptor, &password)
}

pub fn decrypt_signer(
    descriptor: &KeystoreDescriptor,
    password: &str,
) -> Result<PrivateKeySigner> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for keystore '{}'", descriptor.name))?;
    PrivateKeySigner::from_slice(&secret).map_err(|_| {
        eyre!(
            "Keystore '{}' contained unsupported key material",
            descriptor.name
        )
    })
}
