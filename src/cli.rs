use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use curlcheck::capture::{CapturedResponse, Demuxed, RawCapture, demux_indexed, demux_single};
use curlcheck::compare::{ComparisonRules, Facet, compare};
use curlcheck::condition::{ConditionExpression, WhenCondition, evaluate, parse_condition};
use curlcheck::config::{ConfigLoader, EngineConfig};
use curlcheck::invocation::{
    BuildOptions, RequestConfig, RequestSpec, build_batch_plan, build_plan, format_shell_line,
};
use curlcheck::snapshot::{BaselineStore, SnapshotStore, UpdateMode, UpdatePolicy};
use curlcheck::store::StoreContext;
use curlcheck::utils::{DiffFormatter, ResponseFormat, ResponseFormatter};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径（默认向上查找 curlcheck.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 关闭彩色输出（stdout 不是终端时自动关闭）
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 打印 curl 命令行；多个请求文件时生成批量调用
    Plan {
        #[arg(required = true)]
        requests: Vec<PathBuf>,
        /// 输出 JSON 形式的参数列表和 marker
        #[arg(long)]
        json: bool,
    },
    /// 从 curl 的输出中拆出 body、指标和响应头
    Demux {
        stdout: PathBuf,
        #[arg(long)]
        stderr: Option<PathBuf>,
        /// 批量模式下的请求序号
        #[arg(long)]
        index: Option<usize>,
        #[arg(long, value_enum, default_value_t = DemuxFormat::Json)]
        format: DemuxFormat,
    },
    /// 比较两个 JSON 文档，有差异时以非零状态退出
    Compare {
        baseline: PathBuf,
        current: PathBuf,
        #[arg(long)]
        exclude: Vec<String>,
        /// PATH=VALUE，VALUE 为 `*` 或 `regex:<pattern>`
        #[arg(long = "match")]
        match_rules: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// 对 store 变量求值条件表达式
    When {
        #[arg(required = true)]
        expressions: Vec<String>,
        /// 任意一个成立即可（默认需要全部成立）
        #[arg(long)]
        any: bool,
        /// store 变量 key=value
        #[arg(long = "var")]
        vars: Vec<String>,
    },
    /// 用快照检查一个捕获结果（CapturedResponse JSON）
    Snapshot {
        name: String,
        response: PathBuf,
        #[arg(long, default_value = "default")]
        suite: String,
        /// none | all | failing
        #[arg(long, default_value = "none")]
        update: UpdateMode,
        #[arg(long)]
        ci: bool,
        #[arg(long)]
        include: Vec<Facet>,
    },
    /// 与带标签的基线比较；`--save` 时覆盖基线
    Baseline {
        label: String,
        name: String,
        response: PathBuf,
        #[arg(long)]
        save: bool,
    },
}

/// `demux` 的输出形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemuxFormat {
    /// 完整的 JSON（含 `found` 标记）
    Json,
    Compact,
    Verbose,
}

/// 执行子命令，返回是否通过
pub fn run(cli: Cli) -> Result<bool> {
    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load config")?;
    let color = use_color(cli.no_color);

    match cli.command {
        Commands::Plan { requests, json } => plan(&config, &requests, json),
        Commands::Demux {
            stdout,
            stderr,
            index,
            format,
        } => demux(&config, &stdout, stderr.as_deref(), index, format, color),
        Commands::Compare {
            baseline,
            current,
            exclude,
            match_rules,
            json,
        } => compare_files(&baseline, &current, exclude, &match_rules, json, color),
        Commands::When {
            expressions,
            any,
            vars,
        } => when(&expressions, any, &vars),
        Commands::Snapshot {
            name,
            response,
            suite,
            update,
            ci,
            include,
        } => {
            let policy = UpdatePolicy { mode: update, ci };
            snapshot(&config, &name, &response, &suite, policy, include, color)
        }
        Commands::Baseline {
            label,
            name,
            response,
            save,
        } => baseline(&config, &label, &name, &response, save, color),
    }
}

fn use_color(no_color: bool) -> bool {
    !no_color && std::io::stdout().is_terminal()
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn plan(config: &EngineConfig, requests: &[PathBuf], json: bool) -> Result<bool> {
    let specs = requests
        .iter()
        .map(|path| {
            let request = RequestConfig::from_json(&read(path)?)
                .with_context(|| format!("Invalid request file {}", path.display()))?;
            debug!(request = %request.display_name(), "loaded request");
            RequestSpec::try_from(request).map_err(anyhow::Error::from)
        })
        .collect::<Result<Vec<_>>>()?;

    let options = BuildOptions {
        sentinels: config.sentinels.clone(),
        ..BuildOptions::default()
    };
    let plan = match specs.as_slice() {
        [single] => build_plan(single, &options),
        many => build_batch_plan(many, &options),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", format_shell_line(&plan));
    }
    Ok(true)
}

fn demux(
    config: &EngineConfig,
    stdout: &Path,
    stderr: Option<&Path>,
    index: Option<usize>,
    format: DemuxFormat,
    color: bool,
) -> Result<bool> {
    let raw = RawCapture::new(read(stdout)?, stderr.map(read).transpose()?.unwrap_or_default());
    let demuxed = match index {
        Some(index) => demux_indexed(&raw, &config.sentinels, index),
        None => demux_single(&raw, &config.sentinels.single()),
    };

    println!("{}", render_demuxed(&demuxed, format, color)?);
    Ok(demuxed.found)
}

fn render_demuxed(demuxed: &Demuxed, format: DemuxFormat, color: bool) -> Result<String> {
    let format = match format {
        DemuxFormat::Json => return Ok(serde_json::to_string_pretty(demuxed)?),
        DemuxFormat::Compact => ResponseFormat::Compact,
        DemuxFormat::Verbose => ResponseFormat::Verbose,
    };
    Ok(ResponseFormatter::new(format)
        .with_color(color)
        .format(&demuxed.response))
}

fn compare_files(
    baseline: &Path,
    current: &Path,
    exclude: Vec<String>,
    match_rules: &[String],
    json: bool,
    color: bool,
) -> Result<bool> {
    let load = |path: &Path| -> Result<serde_json::Value> {
        serde_json::from_str(&read(path)?)
            .with_context(|| format!("{} is not valid JSON", path.display()))
    };

    let match_rules = match_rules
        .iter()
        .map(|rule| {
            ConfigLoader::parse_cli_var(rule)
                .ok_or_else(|| anyhow!("Invalid match rule '{}', expected PATH=VALUE", rule))
        })
        .collect::<Result<_>>()?;
    let rules = ComparisonRules {
        exclude: (!exclude.is_empty()).then_some(exclude),
        match_rules: Some(match_rules),
        include: None,
    };

    let diffs = compare(&load(baseline)?, &load(current)?, &rules.compile());
    if json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
    } else {
        println!("{}", DiffFormatter::new(color).format(&diffs));
    }
    Ok(diffs.is_empty())
}

fn when(expressions: &[String], any: bool, vars: &[String]) -> Result<bool> {
    let parsed = expressions
        .iter()
        .map(|e| parse_condition(e).with_context(|| format!("Invalid condition '{}'", e)))
        .collect::<Result<Vec<ConditionExpression>>>()?;
    let condition = match (parsed.len(), any) {
        (1, _) => parsed.into_iter().next().map(WhenCondition::Single).unwrap_or_default(),
        (_, true) => WhenCondition::Any(parsed),
        (_, false) => WhenCondition::All(parsed),
    };

    let context = vars
        .iter()
        .map(|var| {
            ConfigLoader::parse_cli_var(var)
                .ok_or_else(|| anyhow!("Invalid variable '{}', expected key=value", var))
        })
        .collect::<Result<StoreContext>>()?;

    let result = evaluate(&condition, &context);
    println!("{}", result);
    Ok(result)
}

fn load_response(path: &Path) -> Result<CapturedResponse> {
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("{} is not a captured response", path.display()))
}

fn snapshot(
    config: &EngineConfig,
    name: &str,
    response: &Path,
    suite: &str,
    policy: UpdatePolicy,
    include: Vec<Facet>,
    color: bool,
) -> Result<bool> {
    let captured = load_response(response)?;
    let request_rules = (!include.is_empty()).then(|| ComparisonRules {
        include: Some(include),
        ..ComparisonRules::default()
    });
    let rules = config.snapshot_rules(request_rules.as_ref());

    let store = SnapshotStore::for_suite(config.snapshot_dir(), suite);
    let check = store.check(name, &captured, &rules, policy)?;

    println!("{}: {}", name, check.status);
    if !check.outcome.diffs.is_empty() {
        println!("{}", DiffFormatter::new(color).format(&check.outcome.diffs));
    }
    Ok(check.passed())
}

fn baseline(
    config: &EngineConfig,
    label: &str,
    name: &str,
    response: &Path,
    save: bool,
    color: bool,
) -> Result<bool> {
    let captured = load_response(response)?;
    let rules = config.diff_rules(None);
    let store = BaselineStore::new(config.baseline_dir());

    if save {
        store.save(label, name, &captured, &rules)?;
        println!("{}: saved to baseline '{}'", name, label);
        return Ok(true);
    }

    let outcome = store.check(label, name, &captured, &rules)?;
    if outcome.is_new_baseline {
        println!("{}: new baseline '{}'", name, label);
        return Ok(true);
    }
    if outcome.diffs.is_empty() {
        println!("{}: matches baseline '{}'", name, label);
        return Ok(true);
    }
    println!("{}", DiffFormatter::new(color).format(&outcome.diffs));
    Ok(false)
}
