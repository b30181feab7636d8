//! Text-generation prompt for a storybook explanation.
//!
//! The prompt carries the output grammar the [`parse`](crate::parse) module
//! splits on, so the two must change together:
//!
//! ```text
//! <PAGE>
//! <TEXT>
//! 2–3 simple sentences explaining ONE idea.
//! </TEXT>
//! <IMAGE>
//! Describe ONE clear picture that matches the text.
//! </IMAGE>
//! </PAGE>
//! ```

use crate::types::{Age, Tone};

/// Minimum and maximum number of pages requested from the generator.
pub const PAGE_RANGE: (usize, usize) = (4, 6);

/// Build the text-generation prompt for a question.
pub fn build(question: &str, age: Age, tone: Tone) -> String {
    let (min_pages, max_pages) = PAGE_RANGE;
    format!(
        r#"You are creating a CHILDREN'S PICTURE BOOK.

Explain the question below clearly for a young child, the way a good
children's book would. Help the child truly understand the idea.

Question: {question}
Child age: {age}
Tone: {tone}

AGE RULES:
- Use words, examples, and sentence length appropriate for a {age}-year-old
- Younger children (3-5): very simple words, short sentences, familiar objects
- Older children (6-10): slightly more detail, but still simple and concrete
- Avoid abstract terms unless they are explained with everyday examples

STRUCTURE:
- Focus on WHAT it is, then WHY it happens, then HOW it works

CONTENT RULES:
- Do NOT mention pictures, illustrations, images, drawings, or visuals in the explanation text
- No parents, no bedtime framing, no characters like mommy, daddy, or teachers
- Do not ask questions back to the child
- No emojis, no titles, no summaries, no extra commentary

BOOK STRUCTURE:
Create {min_pages}-{max_pages} pages.

Each page MUST follow this EXACT format:

<PAGE>
<TEXT>
2-3 simple sentences explaining ONE idea.
</TEXT>
<IMAGE>
Describe ONE clear picture that matches the text.
</IMAGE>
</PAGE>

Do not deviate from this format.
"#,
        question = question.trim(),
        age = age.years(),
        tone = tone.label(),
    )
}
