use std::io::{self, BufRead, Write};
use promptchain::chain::LLMChain;
use promptchain::prompt::errors::TemplateError;
use promptchain::prompt::{Bindings, PromptTemplate};
use promptchain::utils::llm::{GenerateText, GenerationConfig};

use crate::console::Console;

pub const EXIT_SENTINEL: &str = "exit";

const QUESTION_TEMPLATE: &str = "You are a helpful AI assistant. Answer the following question \
                                 clearly and concisely:\n\n{question}";

pub fn question_template() -> Result<PromptTemplate, TemplateError> {
    PromptTemplate::with_variables(QUESTION_TEMPLATE, ["question"])
}

/// Counts of an interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub questions: usize,
    pub failures: usize,
}

/// Ask whether to enter interactive mode. Anything but `yes`/`y` means no.
pub fn ask_to_continue<R: BufRead, O: Write, E: Write>(input: &mut R, console: &mut Console<O, E>) -> io::Result<bool> {
    console.ask("Would you like to enter interactive mode? (yes/no): ")?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "yes" || answer == "y")
}

/// Answer questions read line by line from `input` until the exit sentinel or end of input.
///
/// Blank lines are skipped without calling the model. A failed call is reported and the loop keeps going.
pub async fn run<G, R, O, E>(chain: &LLMChain<G>,
                             config: &GenerationConfig,
                             input: &mut R,
                             console: &mut Console<O, E>) -> io::Result<Session>
    where G: GenerateText,
          R: BufRead,
          O: Write,
          E: Write {
    console.banner("INTERACTIVE MODE")?;
    console.line("Ask any question and get an AI-powered response.")?;
    console.line(&format!("Type '{}' to quit.", EXIT_SENTINEL))?;

    let mut session = Session::default();
    let mut line = String::new();
    loop {
        console.ask("\n🤔 Your question: ")?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            console.line("")?;
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case(EXIT_SENTINEL) {
            break;
        }
        if question.is_empty() {
            console.line("Please enter a valid question.")?;
            continue;
        }

        console.section("💡 Response:")?;
        session.questions += 1;
        let bindings = Bindings::from([("question".to_string(), question.to_string())]);
        match chain.run(&bindings, config).await {
            Ok(reply) => console.response(&reply)?,
            Err(err) => {
                session.failures += 1;
                console.failure(&err)?;
            }
        }
    }
    console.line("\nGoodbye! 👋")?;
    Ok(session)
}
