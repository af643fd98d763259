//! Interactive prompts for values missing from flags and config.

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use super::utils::DEFAULT_COUNT;
use crate::domain::MAX_SEARCH_RESULTS;

#[derive(Debug, Clone, PartialEq)]
pub struct GuidedAnswers {
    pub query: String,
    pub count: usize,
    pub token: Option<String>,
}

pub fn prompt_missing_inputs(count: Option<usize>, has_token: bool) -> Result<GuidedAnswers> {
    let theme = ColorfulTheme::default();
    println!();
    println!("repo-harvest: search -> clone -> archive");
    println!();

    let token = if has_token {
        None
    } else {
        let entered = Password::with_theme(&theme)
            .with_prompt("GitHub token (Enter to skip; searches will be rate limited)")
            .allow_empty_password(true)
            .interact()?;
        normalize_token(&entered)
    };

    let query: String = Input::with_theme(&theme)
        .with_prompt("What are you looking for? (e.g. 'portfolio react')")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("the query must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let count = match count {
        Some(count) => count,
        None => Input::with_theme(&theme)
            .with_prompt("How many repositories?")
            .default(DEFAULT_COUNT)
            .validate_with(|n: &usize| validate_count(*n))
            .interact_text()?,
    };

    Ok(GuidedAnswers { query: query.trim().to_string(), count, token })
}

fn normalize_token(entered: &str) -> Option<String> {
    let trimmed = entered.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_count(n: usize) -> Result<(), String> {
    if n == 0 {
        Err("enter a number greater than 0".to_string())
    } else if n > MAX_SEARCH_RESULTS {
        Err(format!("the search API returns at most {MAX_SEARCH_RESULTS} results"))
    } else {
        Ok(())
    }
}
