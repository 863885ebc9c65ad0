//! Prompt builders for every judge call.

use crate::domain::models::{
    ApplicantProfile, ChatMessage, Evidence, ObjectiveKind, RiskLevel, SearchHit, SearchObjective,
    Snippet,
};

fn scale_description() -> String {
    format!(
        "- GOOD: {} (verified with evidence, logical behavior, stable employment)\n\
         - NORMAL: {} (neutral, standard behavior)\n\
         - MINOR ISSUE: {} (slight concerns, illogical description, suspicious writing)\n\
         - WARNING: {} (red flags, gambling, instability, high risk, major inconsistencies)",
        RiskLevel::Good.score(),
        RiskLevel::Normal.score(),
        RiskLevel::MinorIssue.score(),
        RiskLevel::Warning.score(),
    )
}

/// Behavioral analysis of one snippet.
pub fn text_analysis(
    snippet: &Snippet,
    objective: Option<&str>,
    context: &[Evidence],
) -> String {
    let base_instruction = objective.map_or_else(
        || {
            "You are a credit score evaluator for a bank. Analyze the following text from a \
             loan applicant and evaluate their behavior."
                .to_string()
        },
        |objective| {
            format!(
                "You are a risk analyst. Analyze the following text with this objective: {objective}"
            )
        },
    );

    let mut context_info = String::new();
    if !context.is_empty() {
        context_info.push_str("\nAdditional context from other evidence:\n");
        for evidence in context {
            context_info.push_str(&format!(
                "- Score: {}\n- Insight: {}\n",
                evidence.score, evidence.description
            ));
        }
    }

    let web_warning = if snippet.is_web_search() {
        "\nThis text comes from web search results already verified against the applicant.\n\
         - Only cite information clearly relevant to credit risk.\n\
         - Absence of negative information is not evidence.\n\
         - Neutral or purely biographical information yields an empty evidence list.\n"
    } else {
        ""
    };

    format!(
        "{base_instruction}\n{context_info}{web_warning}\n\
         Text to evaluate:\n\"{text}\"\n\n\
         Assign scores using only this scale:\n{scale}\n\n\
         Return a JSON object with field \"evidence\": a list of items, each with\n\
         - \"score\": one of the scale values\n\
         - \"citation\": an exact excerpt from the text, at most 10 words\n\
         - \"description\": why it matters, at most 15 words\n\
         If there is nothing noteworthy, return {{\"evidence\": []}}. Never invent evidence.",
        text = snippet.text,
        scale = scale_description(),
    )
}

/// Background-check planning from the applicant profile and attached text.
pub fn query_planning(
    profile: Option<&ApplicantProfile>,
    snippets: &[Snippet],
    max_queries: usize,
) -> String {
    let profile_line = profile.map_or_else(|| "unknown".to_string(), ApplicantProfile::summary);
    let documents = snippets
        .iter()
        .map(|s| format!("[{}]\n{}", s.key, s.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You plan web background checks for a loan applicant.\n\
         Applicant: {profile_line}\n\n\
         Documents:\n{documents}\n\n\
         Propose at most {max_queries} web search queries that would verify identity or claims \
         made above.\n\
         Return a JSON object {{\"queries\": [{{\"query\": ..., \"objective\": ..., \"kind\": \
         \"identity\" | \"factual\"}}]}}.\n\
         Use \"identity\" when the query is about the applicant as a person, \"factual\" when it \
         checks an employer, business or public fact."
    )
}

/// Decides which hits concern the subject (identity) or the topic (factual).
pub fn hit_verification(
    profile: Option<&ApplicantProfile>,
    objective: &SearchObjective,
    hits: &[SearchHit],
) -> String {
    let profile_line = profile.map_or_else(|| "unknown".to_string(), ApplicantProfile::summary);
    let rule = match objective.kind {
        ObjectiveKind::Identity => {
            "Accept a result ONLY if it plausibly describes this same person. Same name alone is \
             not enough; location, employer, age or other details must not contradict the applicant."
        }
        ObjectiveKind::Factual => {
            "Accept a result if it is relevant to the objective, even if it does not mention the \
             applicant by name."
        }
    };
    let listing = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{i}] {} ({})\n{}", hit.title, hit.url, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You verify web search results for a background check.\n\
         Applicant: {profile_line}\n\
         Query: {query}\nObjective: {goal}\n\n\
         {rule}\n\nResults:\n{listing}\n\n\
         Return a JSON object {{\"accepted\": [indices], \"reasoning\": \"at most 20 words\"}}.",
        query = objective.query,
        goal = objective.objective,
    )
}

/// Conversation for re-judging one invalidated item.
pub fn reevaluation(original_text: &str, original: &Evidence, reason: &str) -> Vec<ChatMessage> {
    let evaluator = format!(
        "You are a credit score evaluator for a bank. Analyze text from a loan applicant and \
         evaluate their behavior.\n\nScale:\n{}",
        scale_description()
    );
    let prior_turn = serde_json::json!({
        "score": original.score,
        "citation": original.citation,
        "description": original.description,
    })
    .to_string();
    let rules = format!(
        "You must ONLY consider feedback that contradicts the evidence the user invalidated.\n\
         STRICT RULES:\n\
         1. Do not cite any part of the original text unless it directly relates to the feedback.\n\
         2. Do not introduce new concerns, risks or insights the user did not raise.\n\
         3. Decide only whether the evidence is removed (empty list) or replaced by a corrected \
         version of THIS SAME evidence based on the user's reasoning.\n\
         4. Never produce evidence about a different topic.\n\n\
         Return a JSON object with \"reasoning\" (at most 20 words) and \"evidence\": an empty \
         list or exactly one item with \"score\" (one of {}, {}, {}, {}), \"citation\" (at most 10 \
         words from the text) and \"description\" (at most 15 words).\n\
         If the feedback says the evidence is irrelevant, insignificant, outdated, incorrect or \
         should be removed, return an empty list.",
        RiskLevel::Good.score(),
        RiskLevel::Normal.score(),
        RiskLevel::MinorIssue.score(),
        RiskLevel::Warning.score(),
    );

    vec![
        ChatMessage::system(evaluator),
        ChatMessage::user(format!("Original text to evaluate: {original_text}")),
        ChatMessage::assistant(prior_turn),
        ChatMessage::system("User marked this evidence as INVALID"),
        ChatMessage::system(rules),
        ChatMessage::user(reason),
    ]
}
