// ABOUTME: Prompt templates for generation, repair and summarization
// ABOUTME: Every generation template asks for an optional ```pip block followed by one ```python block

/// Format section shared by the generation and repair templates
const RESPONSE_FORMAT: &str = "Response format:
Optional, only when packages must be installed. List every package on one line after 'pip install':
```pip
pip install <packages>
```
Required, exactly one block:
```python
<code>
```";

/// System prompt for the first generation of a request
pub fn system_prompt(additional_context: Option<&str>) -> String {
    format!(
        "Your objective is always to write Python code that completes the human command.

Initial Knowledge: {}

Instructions:
You will receive two inputs in the user message:
- Human Command: the request the human is making
- Context: extra information about the request, such as preferences or a plan summary

Write a complete program. As its last action the program must print a short, human readable summary of what it did and what it found.

{}",
        additional_context.unwrap_or("None"),
        RESPONSE_FORMAT
    )
}

/// User prompt carrying the command and its request context
pub fn user_prompt(command: &str, context: Option<&str>) -> String {
    format!(
        "Human Command: {}\n\nContext: {}\n",
        command,
        context.unwrap_or("None")
    )
}

/// Follow-up prompt sent after a failed execution
pub fn repair_prompt(
    code: &str,
    errors: &str,
    command: &str,
    additional_context: Option<&str>,
) -> String {
    format!(
        "Review the code below and the error it produced. Fix the code, or take a new approach, so that it accomplishes the original human request. Respond only with the blocks described in the response format.

Code:
```python
{}
```

Errors:
{}

{}

Human Request: {}

Additional Context: {}

Answer:",
        code,
        errors,
        RESPONSE_FORMAT,
        command,
        additional_context.unwrap_or("None")
    )
}

/// Prompt asking for a plain language account of a finished run
pub fn summary_prompt(output: &str, request: &str) -> String {
    format!(
        "Objective: Based on the human request and the resulting code output below, summarize what was asked and what the output shows. If the output is not what was expected, explain what went wrong. If it is, describe what was accomplished.

Human Request: {}

Code Output: {}

Summary:",
        request, output
    )
}
