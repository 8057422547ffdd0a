use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{Local, TimeZone, Utc};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use serde::Serialize;
use walkdir::WalkDir;

use memo_common::FilterState;
use memo_filter::query::{state_from_params, write_state_to_params};
use memo_filter::{build_tag_tree, QueryCompiler, DEFAULT_LIST_MEMOS_PAGE_SIZE, SearchParams, TagNode, UserStats, UserStatsStore};

fn main() {
    let matches = Command::new("备忘录筛选工具")
        .version(env!("CARGO_PKG_VERSION"))
        .about("解析筛选查询串、编译后端过滤表达式、生成标签树")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("compile")
                .about("把地址栏查询串编译为后端过滤表达式")
                .arg(Arg::new("query")
                    .short('q')
                    .long("query")
                    .value_name("QUERY")
                    .help("地址栏查询串，例如 filter=tagSearch%3Awork")
                    .required(true))
                .arg(Arg::new("utc")
                    .long("utc")
                    .help("按 UTC 而不是本地时区计算日期边界")
                    .action(ArgAction::SetTrue))
                .arg(Arg::new("scope")
                    .short('s')
                    .long("scope")
                    .value_name("SCOPE")
                    .help("输出完整的列表请求，例如 users/1"))
                .arg(Arg::new("page_size")
                    .long("page-size")
                    .value_name("N")
                    .help("列表请求的分页大小")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("16")),
        )
        .subcommand(
            Command::new("parse")
                .about("解析地址栏查询串，输出筛选状态和规范查询串")
                .arg(Arg::new("query")
                    .short('q')
                    .long("query")
                    .value_name("QUERY")
                    .help("地址栏查询串")
                    .required(true)),
        )
        .subcommand(
            Command::new("tree")
                .about("根据标签计数生成标签树")
                .arg(Arg::new("counts")
                    .short('c')
                    .long("counts")
                    .value_name("FILE")
                    .help("标签计数文件，JSON 对象 {\"标签\": 次数}"))
                .arg(Arg::new("dir")
                    .short('d')
                    .long("dir")
                    .value_name("DIR")
                    .help("统计信息目录，每个 JSON 文件对应一个用户"))
                .group(ArgGroup::new("source")
                    .args(["counts", "dir"])
                    .required(true))
                .arg(Arg::new("json")
                    .long("json")
                    .help("以 JSON 输出")
                    .action(ArgAction::SetTrue)),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("compile", sub)) => run_compile(sub),
        Some(("parse", sub)) => run_parse(sub),
        Some(("tree", sub)) => run_tree(sub),
        _ => Err("未知的子命令".to_string()),
    };

    if let Err(e) = result {
        eprintln!("错误: {}", e);
        std::process::exit(1);
    }
}

fn run_compile(matches: &ArgMatches) -> Result<(), String> {
    let query = required_arg(matches, "query")?;
    let state = state_from_params(&SearchParams::parse(query));
    let scope = matches.get_one::<String>("scope");
    let page_size = matches.get_one::<usize>("page_size").copied().unwrap_or(DEFAULT_LIST_MEMOS_PAGE_SIZE);

    if matches.get_flag("utc") {
        print_compiled(&QueryCompiler::with_timezone(Utc), &state, scope, page_size)
    } else {
        print_compiled(&QueryCompiler::with_timezone(Local), &state, scope, page_size)
    }
}

fn print_compiled<Tz: TimeZone>(
    compiler: &QueryCompiler<Tz>,
    state: &FilterState,
    scope: Option<&String>,
    page_size: usize,
) -> Result<(), String> {
    match scope {
        Some(scope) => {
            let request = compiler.build_list_request(state, scope, page_size, None);
            print_json(&request)
        }
        None => {
            println!("{}", compiler.compile(&state.filters));
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    state: &'a FilterState,
    query: String,
}

fn run_parse(matches: &ArgMatches) -> Result<(), String> {
    let query = required_arg(matches, "query")?;
    let state = state_from_params(&SearchParams::parse(query));

    let mut canonical = SearchParams::new();
    write_state_to_params(&state, &mut canonical);

    print_json(&ParseOutput {
        state: &state,
        query: canonical.to_query_string(),
    })
}

fn run_tree(matches: &ArgMatches) -> Result<(), String> {
    let amounts = if let Some(file) = matches.get_one::<String>("counts") {
        read_counts_file(Path::new(file))?
    } else {
        let dir = required_arg(matches, "dir")?;
        read_stats_dir(Path::new(dir))?
    };

    let tree = build_tag_tree(&amounts);
    if matches.get_flag("json") {
        return print_json(&tree);
    }
    let mut output = String::new();
    render_tree(&tree, 0, &mut output);
    print!("{}", output);
    Ok(())
}

fn required_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, String> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("缺少参数 {}", name))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("序列化失败: {}", e))?;
    println!("{}", json);
    Ok(())
}

// 单个计数文件：{"tag": count}
fn read_counts_file(path: &Path) -> Result<HashMap<String, i64>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("无法读取文件 '{}': {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("解析 '{}' 失败: {}", path.display(), e))
}

// 统计信息目录：每个 .json 文件是一个 UserStats，计数按标签求和
fn read_stats_dir(dir: &Path) -> Result<HashMap<String, i64>, String> {
    if !dir.is_dir() {
        return Err(format!("统计信息目录不存在或不是有效目录 '{}'", dir.display()));
    }

    let mut stats = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| format!("遍历目录失败: {}", e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let content = fs::read_to_string(path)
            .map_err(|e| format!("无法读取文件 '{}': {}", path.display(), e))?;
        match serde_json::from_str::<UserStats>(&content) {
            Ok(user_stats) => stats.push(user_stats),
            Err(e) => eprintln!("警告: 跳过无法解析的统计文件 '{}': {}", path.display(), e),
        }
    }

    let mut store = UserStatsStore::new();
    store.set_stats(stats);
    Ok(store.tag_amounts())
}

fn render_tree(nodes: &[TagNode], depth: usize, output: &mut String) {
    for node in nodes {
        output.push_str(&"  ".repeat(depth));
        output.push('#');
        output.push_str(&node.key);
        if node.amount > 0 {
            output.push_str(&format!(" ({})", node.amount));
        }
        output.push('\n');
        render_tree(&node.sub_tags, depth + 1, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_nested_tree() {
        let amounts: HashMap<String, i64> = [("a", 2), ("a/b", 3), ("a/b/c", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mut output = String::new();
        render_tree(&build_tag_tree(&amounts), 0, &mut output);
        assert_eq!(output, "#a (2)\n  #b (3)\n    #c\n");
    }
}
