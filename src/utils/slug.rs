use std::sync::LazyLock;
use regex::Regex;

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("Invalid Regex")
});

/// 由显示名称生成 URL 安全的 slug：小写、非字母数字折叠为单个 `-`、去掉首尾 `-`。
/// 结果可能为空（例如名称全部由符号组成），调用方需自行处理。
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
