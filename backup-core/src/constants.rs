/// 持久化状态键（与应用其他状态隔离）
pub mod state_keys {
    /// 备份设置
    pub const BACKUP_SETTINGS: &str = "backup.settings";

    /// 最近一次备份运行状态
    pub const BACKUP_STATUS: &str = "backup.status";
}

/// 备份设置相关常量
pub mod settings {
    use std::path::PathBuf;

    /// 最小间隔（分钟）
    pub const MIN_INTERVAL_MINUTES: i64 = 5;

    /// 最大间隔（分钟），即一天
    pub const MAX_INTERVAL_MINUTES: i64 = 1440;

    /// 默认间隔（分钟）
    pub const DEFAULT_INTERVAL_MINUTES: i64 = 1440;

    /// 默认备份目录名
    pub const DEFAULT_BACKUP_DIR_NAME: &str = "backups";

    /// 获取默认备份目录（相对于工作目录）
    pub fn get_default_backup_dir() -> PathBuf {
        PathBuf::from(DEFAULT_BACKUP_DIR_NAME)
    }
}

/// 备份文件命名相关常量
pub mod backup {
    /// 数据库快照文件前缀
    pub const DATABASE_PREFIX: &str = "cmms_database";

    /// 已完成工作导出文件前缀
    pub const COMPLETED_EXCEL_PREFIX: &str = "tamamlanan_isler";

    /// 表格文件扩展名
    pub const EXCEL_EXTENSION: &str = "xlsx";

    /// 时间戳格式（本地时间，精确到秒）
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// 数据文件旁的日志文件后缀：SQLite 的 WAL/SHM，DuckDB 的 WAL
    pub const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", ".wal"];
}

/// 主数据库连接相关常量
pub mod database {
    /// 连接串环境变量
    pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

    /// 默认连接串
    pub const DEFAULT_DATABASE_URL: &str = "file:./cmms.duckdb";

    /// 连接串中的文件协议前缀
    pub const FILE_SCHEME: &str = "file:";

    /// 相对路径的第二候选目录
    pub const DATA_SUBDIR: &str = "data";
}

/// 导出表格相关常量
pub mod excel {
    /// 工作表名称
    pub const SHEET_NAME: &str = "Tamamlanan İşler";

    /// 缺省占位值
    pub const PLACEHOLDER: &str = "-";

    /// 日期显示格式
    pub const DATE_FORMAT: &str = "%d.%m.%Y";

    /// 表头（列顺序固定）
    pub const HEADERS: [&str; 14] = [
        "Kayıt No",
        "Tarih",
        "Vardiya",
        "Personel",
        "Sicil No",
        "Bölüm",
        "Ekipman",
        "Müdahale Türü",
        "Başlangıç",
        "Bitiş",
        "Süre (dk)",
        "Açıklama",
        "Kullanılan Malzeme",
        "Analiz Ataması",
    ];

    /// 列宽提示（与表头一一对应）
    pub const COLUMN_WIDTHS: [f64; 14] = [
        10.0, 12.0, 12.0, 24.0, 12.0, 18.0, 22.0, 20.0, 10.0, 10.0, 10.0, 40.0, 30.0, 32.0,
    ];
}

/// 应用配置相关常量
pub mod config {
    /// 配置文件查找顺序
    pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["cmms-backup.toml", "config.toml"];

    /// 默认配置文件名
    pub const CONFIG_FILE_NAME: &str = "cmms-backup.toml";

    /// 日志文件环境变量
    pub const LOG_FILE_ENV: &str = "CMMS_BACKUP_LOG_FILE";
}

/// 技术版本信息常量
pub mod version {
    /// 核心库版本（自动同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
