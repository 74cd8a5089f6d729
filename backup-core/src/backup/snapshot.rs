use crate::constants::{backup, database};
use crate::error::{BackupError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 主数据文件定位器
///
/// 连接串可以带一层引号、`file:` 前缀和 `?query` 后缀。绝对路径只有一个
/// 候选；相对路径依次尝试 `<base>/<path>` 与 `<base>/data/<path>`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileLocator {
    url: String,
    base_dir: PathBuf,
}

impl DataFileLocator {
    pub fn new(url: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            base_dir: base_dir.into(),
        }
    }

    /// 以工作目录为基准
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Ok(Self::new(url, std::env::current_dir()?))
    }

    /// 连接串对应的文件路径（未解析候选）
    pub fn file_path(&self) -> PathBuf {
        let unquoted = strip_quotes(self.url.trim());
        let without_scheme = unquoted
            .strip_prefix(database::FILE_SCHEME)
            .unwrap_or(unquoted);
        let without_query = without_scheme
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(without_scheme);
        PathBuf::from(strip_quotes(without_query.trim()))
    }

    /// 全部候选路径，按优先级排列
    pub fn candidates(&self) -> Vec<PathBuf> {
        let path = self.file_path();
        if path.is_absolute() {
            vec![path]
        } else {
            vec![
                self.base_dir.join(&path),
                self.base_dir.join(database::DATA_SUBDIR).join(&path),
            ]
        }
    }

    /// 已存在的候选；都不存在时返回 `NotFound`
    pub fn resolve(&self) -> Result<PathBuf> {
        let candidates = self.candidates();
        candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .cloned()
            .ok_or_else(|| {
                let tried: Vec<String> = candidates
                    .iter()
                    .map(|c| c.display().to_string())
                    .collect();
                BackupError::not_found(format!("主数据库文件不存在，已尝试: {}", tried.join(", ")))
            })
    }

    /// 打开数据库时使用的路径：已存在的候选，否则第一个候选
    pub fn preferred_path(&self) -> PathBuf {
        self.resolve().unwrap_or_else(|_| {
            self.candidates()
                .into_iter()
                .next()
                .unwrap_or_else(|| self.file_path())
        })
    }
}

/// 去掉一层成对的引号
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// 复制主数据文件（及其日志旁文件）到备份目录，返回主备份文件路径
pub async fn export_database_snapshot(
    locator: &DataFileLocator,
    backup_dir: &Path,
    token: &str,
) -> Result<PathBuf> {
    let source = locator.resolve()?;

    let file_name = match source.extension() {
        Some(ext) => format!(
            "{}_{}.{}",
            backup::DATABASE_PREFIX,
            token,
            ext.to_string_lossy()
        ),
        None => format!("{}_{}", backup::DATABASE_PREFIX, token),
    };
    let target = backup_dir.join(file_name);

    info!("开始复制数据库快照: {} -> {}", source.display(), target.display());

    let source_for_copy = source.clone();
    let target_for_copy = target.clone();
    tokio::task::spawn_blocking(move || copy_with_sidecars(&source_for_copy, &target_for_copy))
        .await
        .map_err(|e| BackupError::export(format!("数据库快照任务失败: {e}")))??;

    info!("数据库快照完成: {}", target.display());
    Ok(target)
}

fn copy_with_sidecars(source: &Path, target: &Path) -> Result<()> {
    std::fs::copy(source, target).map_err(|e| {
        BackupError::export(format!(
            "复制数据库文件失败 {} -> {}: {e}",
            source.display(),
            target.display()
        ))
    })?;

    for suffix in backup::SIDECAR_SUFFIXES {
        let sidecar = append_suffix(source, suffix);
        if !sidecar.is_file() {
            continue;
        }
        let sidecar_target = append_suffix(target, suffix);
        std::fs::copy(&sidecar, &sidecar_target).map_err(|e| {
            BackupError::export(format!("复制日志文件失败 {}: {e}", sidecar.display()))
        })?;
        debug!("已复制日志文件: {}", sidecar_target.display());
    }

    Ok(())
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_path_strips_quotes_scheme_and_query() {
        let cases = [
            ("file:./cmms.db", "./cmms.db"),
            ("\"file:./cmms.db\"", "./cmms.db"),
            ("'file:dev.db?connection_limit=1'", "dev.db"),
            ("file:\"/var/lib/cmms.db\"", "/var/lib/cmms.db"),
            ("plain.duckdb", "plain.duckdb"),
        ];
        for (url, expected) in cases {
            let locator = DataFileLocator::new(url, "/base");
            assert_eq!(locator.file_path(), PathBuf::from(expected), "url: {url}");
        }
    }

    #[test]
    fn test_candidates_for_relative_and_absolute() {
        let relative = DataFileLocator::new("file:./cmms.db", "/base");
        assert_eq!(
            relative.candidates(),
            vec![
                PathBuf::from("/base/./cmms.db"),
                PathBuf::from("/base/data/./cmms.db")
            ]
        );

        let absolute = DataFileLocator::new("file:/srv/cmms.db", "/base");
        assert_eq!(absolute.candidates(), vec![PathBuf::from("/srv/cmms.db")]);
    }

    #[test]
    fn test_resolve_picks_existing_candidate() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        std::fs::write(temp_dir.path().join("data").join("cmms.db"), b"db").unwrap();

        let locator = DataFileLocator::new("file:cmms.db", temp_dir.path());
        assert_eq!(
            locator.resolve().unwrap(),
            temp_dir.path().join("data").join("cmms.db")
        );

        // 两个候选都存在时优先工作目录
        std::fs::write(temp_dir.path().join("cmms.db"), b"db").unwrap();
        assert_eq!(locator.resolve().unwrap(), temp_dir.path().join("cmms.db"));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let locator = DataFileLocator::new("file:missing.db", temp_dir.path());
        assert!(matches!(locator.resolve(), Err(BackupError::NotFound(_))));
        assert_eq!(locator.preferred_path(), temp_dir.path().join("missing.db"));
    }

    #[tokio::test]
    async fn test_snapshot_copies_file_and_present_sidecars() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("cmms.db");
        std::fs::write(&source, b"main").unwrap();
        std::fs::write(temp_dir.path().join("cmms.db-wal"), b"wal").unwrap();

        let backup_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&backup_dir).unwrap();

        let locator = DataFileLocator::new("file:cmms.db", temp_dir.path());
        let produced = export_database_snapshot(&locator, &backup_dir, "20240102_030405")
            .await
            .unwrap();

        assert_eq!(produced, backup_dir.join("cmms_database_20240102_030405.db"));
        assert_eq!(std::fs::read(&produced).unwrap(), b"main");
        assert_eq!(
            std::fs::read(backup_dir.join("cmms_database_20240102_030405.db-wal")).unwrap(),
            b"wal"
        );
        assert!(!backup_dir.join("cmms_database_20240102_030405.db-shm").exists());
    }

    #[tokio::test]
    async fn test_snapshot_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("store"), b"x").unwrap();

        let locator = DataFileLocator::new("store", temp_dir.path());
        let produced = export_database_snapshot(&locator, temp_dir.path(), "20240102_030405")
            .await
            .unwrap();
        assert_eq!(produced, temp_dir.path().join("cmms_database_20240102_030405"));
    }

    #[tokio::test]
    async fn test_snapshot_into_missing_dir_is_export_failure() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("cmms.db"), b"x").unwrap();

        let locator = DataFileLocator::new("cmms.db", temp_dir.path());
        let result =
            export_database_snapshot(&locator, &temp_dir.path().join("nope"), "20240102_030405")
                .await;
        assert!(matches!(result, Err(BackupError::Export(_))));
    }
}
