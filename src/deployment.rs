use alloy::primitives::Address;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Local,
    Sepolia,
    Mainnet,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Local => "local",
            DeploymentEnv::Sepolia => "sepolia",
            DeploymentEnv::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Local => "Local",
            DeploymentEnv::Sepolia => "Sepolia",
            DeploymentEnv::Mainnet => "Mainnet",
        };
        write!(f, "{name}")
    }
}

/// Where the Red, DataLogger and USDTDataStorage contracts were deployed for
/// one environment. Older records predate the data-storage contract.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub red_packet_address: Address,
    pub data_logger_address: Address,
    #[serde(default)]
    pub data_storage_address: Option<Address>,
    pub network_url: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::at(Path::new(DEPLOYMENTS_ROOT), env)
    }

    pub fn at(root: &Path, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root, env)?;
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Vec<DeploymentRecord>> {
        read_records(&self.path)
    }

    pub fn append(&self, record: DeploymentRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        write_records(&self.path, &records)
    }

    /// The most recently appended record, if any.
    pub fn latest(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.load()?.pop())
    }

    /// Latest record pointing at `network_url`.
    pub fn latest_for(&self, network_url: &str) -> Result<Option<DeploymentRecord>> {
        Ok(self
            .load()?
            .into_iter()
            .rev()
            .find(|r| r.network_url == network_url))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn new_record(
    red_packet_address: Address,
    data_logger_address: Address,
    data_storage_address: Option<Address>,
    network_url: impl AsRef<str>,
    chain_id: Option<u64>,
) -> DeploymentRecord {
    DeploymentRecord {
        deployed_at: Utc::now().to_rfc3339(),
        red_packet_address,
        data_logger_address,
        data_storage_address,
        network_url: network_url.as_ref().to_string(),
        chain_id,
    }
}

pub fn ensure_structure() -> Result<()> {
    for env in [
        DeploymentEnv::Local,
        DeploymentEnv::Sepolia,
        DeploymentEnv::Mainnet,
    ] {
        let _ = ensure_store(Path::new(DEPLOYMENTS_ROOT), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root).wrap_err_with(|| {
            format!("Failed to create {} directory", root.display())
        })?;
    }

    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).wrap_err_with(|| {
            format!("Failed to create {} directory", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).wrap_err_with(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"[]").wrap_err_with(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_records(path: impl AsRef<Path>) -> Result<Vec<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).wrap_err("Failed to read deployment records")?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let records = serde_json::from_slice::<Vec<DeploymentRecord>>(&data)
        .wrap_err("Failed to parse deployment records JSON")?;
    Ok(records)
}

fn write_records(path: impl AsRef<Path>, records: &[DeploymentRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)
        .wrap_err("Failed to serialize deployment records")?;
    fs::write(path.as_ref(), json).wrap_err("Failed to write deployment records")?;
    Ok(())
}

/// Parses a contract address given on the command line.
#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn at__creates_empty_store_file() {
        // given
        let root = TempDir::new("deployments").unwrap();

        // when
        let store = DeploymentStore::at(root.path(), DeploymentEnv::Local).unwrap();

        // then
        assert!(store.path().ends_with("local/deployments.json"));
        assert_eq!(store.load().unwrap(), Vec::new());
    }

    #[test]
    fn latest_for__returns_newest_record_for_url() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(root.path(), DeploymentEnv::Sepolia).unwrap();
        let old = new_record(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            None,
            "http://a",
            Some(11155111),
        );
        let other = new_record(
            Address::repeat_byte(3),
            Address::repeat_byte(4),
            Some(Address::repeat_byte(9)),
            "http://b",
            None,
        );
        let newest = new_record(
            Address::repeat_byte(5),
            Address::repeat_byte(6),
            None,
            "http://a",
            Some(11155111),
        );
        store.append(old).unwrap();
        store.append(newest.clone()).unwrap();
        store.append(other.clone()).unwrap();

        // when
        let found = store.latest_for("http://a").unwrap();

        // then
        assert_eq!(found, Some(newest));
        assert_eq!(store.latest().unwrap(), Some(other));
    }

    #[test]
    fn load__reads_records_written_before_data_storage_existed() {
        // given
        let root = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::at(root.path(), DeploymentEnv::Local).unwrap();
        let legacy = r#"[{
            "deployed_at": "2025-01-01T00:00:00+00:00",
            "red_packet_address": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512",
            "data_logger_address": "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0",
            "network_url": "http://127.0.0.1:8545"
        }]"#;
        fs::write(store.path(), legacy).unwrap();

        // when
        let records = store.load().unwrap();

        // then
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data_storage_address, None);
        assert_eq!(records[0].chain_id, None);
    }
}
