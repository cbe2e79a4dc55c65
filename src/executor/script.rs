use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::types::RequestSpec;

const REQUESTS_TEMPLATE: &str = include_str!("../../resources/grinder-requests.tpl");

/// Embedded logback configuration placed on the worker classpath.
pub(crate) const LOGBACK_WORKER: &str = include_str!("../../resources/logback-worker.xml");

fn script_line_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*grinder\.script\s*[=:]\s*(.*?)\s*$").ok())
        .as_ref()
}

/// Builds a Jython script issuing each request in order.
pub(crate) fn synthesize(requests: &[RequestSpec]) -> String {
    let mut script = String::from(REQUESTS_TEMPLATE);
    if !script.ends_with('\n') {
        script.push('\n');
    }
    for request in requests {
        let url = request.url.replace('\\', "\\\\").replace('"', "\\\"");
        script.push_str("\t\trequest.");
        script.push_str(&request.method);
        script.push_str("(\"");
        script.push_str(&url);
        script.push_str("\")\n");
    }
    script
}

/// Properties text after the script-path normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScriptRewrite {
    /// Value of the last `grinder.script` line, before rewriting.
    pub declared: Option<String>,
    pub contents: String,
}

/// Keeps only the last `grinder.script` line. With an explicit script its
/// value becomes the script's file name, otherwise the declared value stays.
pub(crate) fn rewrite_script_path(contents: &str, explicit: Option<&Path>) -> ScriptRewrite {
    let Some(pattern) = script_line_pattern() else {
        return ScriptRewrite {
            declared: None,
            contents: contents.to_owned(),
        };
    };
    let lines: Vec<&str> = contents.split_inclusive('\n').collect();
    let matches: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            pattern
                .captures(line.trim_end_matches(['\r', '\n']))
                .and_then(|captures| captures.get(1))
                .map(|value| (index, value.as_str().to_owned()))
        })
        .collect();
    let Some((last_index, declared)) = matches.last().cloned() else {
        return ScriptRewrite {
            declared: None,
            contents: contents.to_owned(),
        };
    };

    let value = explicit
        .and_then(Path::file_name)
        .map_or_else(|| declared.clone(), |name| name.to_string_lossy().into_owned());
    let mut rewritten = String::with_capacity(contents.len());
    for (index, line) in lines.iter().enumerate() {
        if index == last_index {
            rewritten.push_str("grinder.script=");
            rewritten.push_str(&value);
            rewritten.push('\n');
        } else if matches.iter().all(|(matched, _)| *matched != index) {
            rewritten.push_str(line);
        }
    }
    ScriptRewrite {
        declared: Some(declared),
        contents: rewritten,
    }
}
