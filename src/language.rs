//! File extension → language label mapping.
//!
//! Labels are stored on `files.language` and `chunks.language`, used for
//! query-time language filtering and for the fenced code blocks in the LLM
//! prompt. Anything not in the table maps to `"Unknown"`.

/// Map a file extension (with leading dot, any case) to its language label.
pub fn from_ext(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        ".go" => "Go",
        ".py" => "Python",
        ".js" => "JavaScript",
        ".ts" => "TypeScript",
        ".java" => "Java",
        ".c" => "C",
        ".cpp" => "C++",
        ".h" => "C/C++ Header",
        ".hpp" => "C++ Header",
        ".cs" => "C#",
        ".php" => "PHP",
        ".rb" => "Ruby",
        ".rs" => "Rust",
        ".swift" => "Swift",
        ".kt" => "Kotlin",
        ".sh" => "Shell",
        ".html" => "HTML",
        ".css" => "CSS",
        ".sql" => "SQL",
        ".md" => "Markdown",
        _ => "Unknown",
    }
}
