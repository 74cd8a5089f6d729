use backup_core::{config::AppConfig, constants::config, error::Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 运行独立的初始化流程，返回配置文件路径
pub async fn run_init(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    info!("🗄️  CMMS Backup 初始化");
    info!("======================");

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));

    if path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", path.display());
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: cmms-backup init --force");
        return Ok(path);
    }

    let app_config = AppConfig::default();
    app_config.save_to_file(&path)?;
    info!("   ✅ 创建配置文件: {}", path.display());
    info!("      - 主数据库: {}", app_config.database.url);
    info!("      - 默认备份目录: {}", app_config.backup.default_dir);

    info!("🎉 初始化完成！");
    info!("📝 接下来的步骤:");
    info!("   1️⃣  编辑 {} 指定主数据库位置（或设置 DATABASE_URL）", path.display());
    info!("   2️⃣  运行 'cmms-backup run' 立即执行一次备份");
    info!("   3️⃣  运行 'cmms-backup serve' 启动定时备份");

    Ok(path)
}
