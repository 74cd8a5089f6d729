use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 备份设置相关命令
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// 显示当前备份设置
    Show,
    /// 修改备份设置，只更新提供的字段
    Set {
        /// 是否启用自动备份
        #[arg(long, help = "true 启用，false 禁用")]
        enabled: Option<bool>,
        /// 自动备份间隔（分钟，5 - 1440）
        #[arg(long, help = "自动备份间隔（分钟），超出范围会被截断到 5 - 1440")]
        interval: Option<i64>,
        /// 备份输出目录
        #[arg(long)]
        dir: Option<PathBuf>,
        /// 是否包含数据库快照
        #[arg(long)]
        include_database: Option<bool>,
        /// 是否包含已完成工作表格
        #[arg(long)]
        include_excel: Option<bool>,
    },
}

/// CMMS Backup - 定时备份与导出工具
#[derive(Parser)]
#[command(name = "cmms-backup")]
#[command(about = "CMMS 数据库快照与已完成工作表格的定时备份工具")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径（默认按 cmms-backup.toml、config.toml 顺序查找）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 创建配置文件
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 显示备份状态
    Status,
    /// 备份设置管理
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// 立即执行一次备份
    Run,
    /// 常驻运行，按设置定时自动备份（Ctrl-C 退出）
    Serve,
    /// 写入示例的已完成工作数据
    SeedDemo {
        /// 写入的工作条数
        #[arg(long, default_value = "3")]
        count: usize,
    },
}
