use litreview_core::ArticleRecord;

/// Maximum number of characters of article text included per block.
pub const SNIPPET_CHARS: usize = 4000;

const SYSTEM_PROMPT: &str =
    "Tu es un assistant scientifique qui rédige des synthèses de veille bibliographique.";

const REVIEW_PREAMBLE: &str = "\
You are a scientific assistant helping to summarise recent research articles. \
Write a concise literature review in French (≤ 600 mots) that: \n\
- Synthétise les contributions majeures de chaque article.\n\
- Compare les approches et met en évidence les points communs ou divergents.\n\
- Liste les pistes d'application potentielles et les limites identifiées.\n\
- Termine par des recommandations pour approfondir la veille scientifique.\n\n\
Voici les articles à analyser:\n\n";

/// Build the system prompt for the review LLM.
///
/// # Examples
///
/// ```
/// use litreview_review::prompt::build_system_prompt;
///
/// assert!(build_system_prompt().contains("assistant scientifique"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Render one article as a prompt block.
///
/// Missing metadata is replaced by placeholders; the title falls back to the
/// identifier. Only the first [`SNIPPET_CHARS`] characters of `text` are kept.
///
/// # Examples
///
/// ```
/// use litreview_core::ArticleRecord;
/// use litreview_review::prompt::article_block;
///
/// let record = ArticleRecord {
///     id: "paper-1".into(),
///     title: None,
///     authors: vec![],
///     published_at: None,
///     s3_text_key: None,
///     extracted_text: None,
/// };
/// let block = article_block(&record, "Body");
/// assert!(block.starts_with("Title: paper-1\n"));
/// assert!(block.contains("Authors: Unknown authors\n"));
/// assert!(block.contains("Published: Unknown date\n"));
/// ```
pub fn article_block(record: &ArticleRecord, text: &str) -> String {
    let title = record
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&record.id);
    let mut authors = record.authors.join(", ");
    if authors.is_empty() {
        authors.push_str("Unknown authors");
    }
    let published = record
        .published_at
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("Unknown date");

    format!(
        "Title: {title}\nAuthors: {authors}\nPublished: {published}\nContent snippet:\n{}\n",
        snippet(text, SNIPPET_CHARS)
    )
}

/// The first `max_chars` characters of `text`.
pub fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the user prompt from rendered article blocks.
///
/// Blocks keep their order and are separated by a blank line.
///
/// # Examples
///
/// ```
/// use litreview_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt(&["Title: A\n".to_string(), "Title: B\n".to_string()]);
/// assert!(prompt.ends_with("Title: A\n\n\nTitle: B\n"));
/// ```
pub fn build_review_prompt(blocks: &[String]) -> String {
    let mut prompt = String::from(REVIEW_PREAMBLE);
    prompt.push_str(&blocks.join("\n\n"));
    prompt
}
