//! README generation prompt.

const TEMPLATE: &str = "\
You are an expert software documentation generator.

Below is a snapshot of a repository's structure and content.

Your job:
- Analyze code
- Infer architecture & purpose
- Identify components & technologies
- Produce a polished README.md

README MUST INCLUDE:
- Project Title
- Description
- Features
- Architecture Overview
- Folder Structure
- Installation Steps
- Usage Instructions
- API Documentation (if detected)
- Module Descriptions
- Contributing Guide
- Future Enhancements

Only output valid README.md content.

Repository Snapshot:
";

/// Wrap an already budgeted snapshot in the README instructions.
pub fn build_prompt(snapshot_json: &str) -> String {
    let mut prompt = String::with_capacity(TEMPLATE.len() + snapshot_json.len() + 1);
    prompt.push_str(TEMPLATE);
    prompt.push_str(snapshot_json);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_follows_instructions() {
        let prompt = build_prompt("{\"a.rs\": \"fn a() {}\"}");
        let marker = prompt.find("Repository Snapshot:").unwrap();
        assert!(prompt.find("Module Descriptions").unwrap() < marker);
        assert!(prompt.ends_with("{\"a.rs\": \"fn a() {}\"}\n"));
    }
}
