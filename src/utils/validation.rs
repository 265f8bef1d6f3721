use anyhow::Result;

pub const MAX_BREAKOUT_ROOMS: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceArgs {
    pub question: String,
    pub options: Vec<String>,
    pub answer: Option<usize>,
}

/// Parses `question | option | option [| answer=N]`. `N` is 1-based.
pub fn parse_choice_args(text: &str, allow_answer: bool) -> Result<ChoiceArgs> {
    let mut parts: Vec<String> = text.split('|').map(|part| part.trim().to_string()).collect();

    let mut answer = None;
    if let Some(last) = parts.last() {
        if let Some(value) = last.strip_prefix("answer=") {
            if !allow_answer {
                return Err(anyhow::anyhow!("Feedback polls have no correct answer"));
            }
            let number: usize = value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("answer must be the number of an option, e.g. answer=2"))?;
            if number == 0 {
                return Err(anyhow::anyhow!("Options are numbered from 1"));
            }
            answer = Some(number - 1);
            parts.pop();
        }
    }

    if parts.len() < 3 {
        return Err(anyhow::anyhow!(
            "Use: question | option 1 | option 2 [| more options]"
        ));
    }

    let question = parts.remove(0);
    if question.is_empty() {
        return Err(anyhow::anyhow!("The question must not be empty"));
    }

    Ok(ChoiceArgs {
        question,
        options: parts,
        answer,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentArgs {
    pub title: String,
    pub due: String,
    pub details: String,
}

/// Parses `title | due | details`.
pub fn parse_assignment_args(text: &str) -> Result<AssignmentArgs> {
    let parts: Vec<&str> = text.splitn(3, '|').map(str::trim).collect();
    match parts.as_slice() {
        [title, due, details] if !title.is_empty() && !due.is_empty() => Ok(AssignmentArgs {
            title: title.to_string(),
            due: due.to_string(),
            details: details.to_string(),
        }),
        _ => Err(anyhow::anyhow!("Use: title | due date | details")),
    }
}

pub fn validate_breakout_count(count: u32) -> Result<u32> {
    if count == 0 || count > MAX_BREAKOUT_ROOMS {
        return Err(anyhow::anyhow!(
            "Room count must be between 1 and {}",
            MAX_BREAKOUT_ROOMS
        ));
    }
    Ok(count)
}

pub fn validate_not_blank<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow::anyhow!("{} must not be empty", what));
    }
    Ok(text)
}
