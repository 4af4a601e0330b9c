//! Built-in language profiles.

use crate::profile::{HeredocDelim, LanguageProfile, StringDelim};

/// Every language the segmenter knows out of the box
pub fn builtin_profiles() -> Vec<LanguageProfile> {
    vec![
        c_like("c_cpp", &[".c", ".cc", ".cpp", ".cxx", ".h", ".hpp"])
            .with_heredoc(cpp_raw_string())
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'"))
            .with_line_continuation("\\"),
        LanguageProfile::new("css")
            .with_extensions(&[".css"])
            .with_block_comment("/*", "*/")
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'")),
        c_like("golang", &[".go"])
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'"))
            .with_string(StringDelim::raw("`", "`")),
        LanguageProfile::new("html")
            .with_extensions(&[".html", ".htm"])
            .with_block_comment("<!--", "-->")
            .with_string(StringDelim::multiline("\""))
            .with_string(StringDelim::multiline("'")),
        c_like("java", &[".java"])
            .with_string(StringDelim::multiline("\"\"\""))
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'")),
        c_like("javascript", &[".js", ".mjs", ".cjs", ".jsx"])
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'"))
            .with_string(StringDelim::template("`")),
        c_like("json5", &[".json", ".json5"])
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'")),
        LanguageProfile::new("python")
            .with_extensions(&[".py", ".pyw"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::multiline("\"\"\""))
            .with_string(StringDelim::multiline("'''"))
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'"))
            .with_line_continuation("\\"),
        LanguageProfile::new("rust")
            .with_extensions(&[".rs"])
            .with_line_comments(&["///", "//"])
            .with_block_comment("/*", "*/")
            .with_string(StringDelim::raw("r#\"", "\"#"))
            .with_string(StringDelim::multiline("\"")),
        LanguageProfile::new("sh")
            .with_extensions(&[".sh", ".bash"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::multiline("\""))
            .with_string(StringDelim::raw("'", "'")),
        LanguageProfile::new("sql")
            .with_extensions(&[".sql"])
            .with_line_comments(&["--"])
            .with_block_comment("/*", "*/")
            .with_string(StringDelim::raw("'", "'"))
            .with_string(StringDelim::raw("\"", "\"")),
        LanguageProfile::new("toml")
            .with_extensions(&[".toml"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::multiline("\"\"\""))
            .with_string(StringDelim::raw("'''", "'''"))
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::literal("'")),
        c_like("typescript", &[".ts", ".tsx", ".mts", ".cts"])
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::escaped("'"))
            .with_string(StringDelim::template("`")),
        c_like("verilog", &[".v"]).with_string(StringDelim::escaped("\"")),
        LanguageProfile::new("yaml")
            .with_extensions(&[".yaml", ".yml"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::escaped("\""))
            .with_string(StringDelim::literal("'")),
    ]
}

/// C++11 raw strings, `R"tag( ... )tag"`; the tag is at most 16 characters
fn cpp_raw_string() -> HeredocDelim {
    HeredocDelim {
        start_prefix: "R\"".to_string(),
        ident_pattern: r#"[^()\\\s"]{0,16}"#.to_string(),
        start_suffix: "(".to_string(),
        stop_prefix: ")".to_string(),
        stop_suffix: "\"".to_string(),
    }
}

fn c_like(id: &str, extensions: &[&str]) -> LanguageProfile {
    LanguageProfile::new(id)
        .with_extensions(extensions)
        .with_line_comments(&["//"])
        .with_block_comment("/*", "*/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_profiles_are_valid() {
        for profile in builtin_profiles() {
            assert!(profile.validate().is_ok(), "{} is invalid", profile.id);
        }
    }

    #[test]
    fn test_builtin_ids_and_extensions_unique() {
        let mut ids = HashSet::new();
        let mut extensions = HashSet::new();
        for profile in builtin_profiles() {
            assert!(ids.insert(profile.id.clone()), "duplicate id {}", profile.id);
            for ext in &profile.extensions {
                assert!(extensions.insert(ext.clone()), "duplicate extension {}", ext);
            }
        }
    }
}
