use clap::Parser;

/// prompt-relay - 先改写后生成的 Prompt 中转服务
#[derive(Parser, Debug)]
#[command(name = "prompt-relay", version, about, long_about = None)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// 强制使用本地模拟后端（忽略配置中的 mockMode）
    #[arg(long)]
    pub mock: bool,
}
