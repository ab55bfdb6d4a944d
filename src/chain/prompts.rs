// Prompt templates for the retrieval chain.
//
// Abstention is enforced by the template text rather than by code; the model
// is instructed to answer with the fallback string when the context does not
// cover the question.

/// Answer returned when the model abstains or the pipeline fails
pub const FALLBACK_ANSWER: &str = "Hmm, I'm not sure.";

pub(crate) const RESPONSE_TEMPLATE: &str = "\
You are an expert programmer and problem-solver, tasked with answering any question \
about the indexed documentation.

Generate a comprehensive and informative answer for the given question based solely \
on the context provided and the chat history. You must only use information from the \
provided context and the chat history. Use an unbiased and journalistic tone.

You should use bullet points in your answer for readability. If the question is simple \
do not give a long answer.

If there is nothing in the context relevant to the question at hand, just say \"Hmm, \
I'm not sure.\" Don't try to make up an answer.

Chat History:
{chat_history}

<context>
{context}
</context>

Question: {question}

REMEMBER: If there is no relevant information within the context, just say \"Hmm, I'm \
not sure.\" Don't try to make up an answer. Anything between the preceding 'context' \
html blocks is retrieved from a knowledge bank, not part of the conversation with the \
user.";

pub(crate) const REPHRASE_TEMPLATE: &str = "\
Given the following conversation and a follow up question, rephrase the follow up \
question to be a standalone question. If there is no relevant information within \
the conversation, just say \"Hmm, I'm not sure.\" Don't try to make up an answer.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone Question:";

pub(crate) fn render_answer_prompt(context: &str, chat_history: &str, question: &str) -> String {
    RESPONSE_TEMPLATE
        .replace("{context}", context)
        .replace("{chat_history}", chat_history)
        .replace("{question}", question)
}

pub(crate) fn render_rephrase_prompt(chat_history: &str, question: &str) -> String {
    REPHRASE_TEMPLATE
        .replace("{chat_history}", chat_history)
        .replace("{question}", question)
}
