pub const TITLE: &str = "Causal Prompt Optimization Lab";

/// Static documentation panel (markdown).
pub const DOCUMENTATION: &str = "\
## Project Overview

This dashboard evaluates the causal impact of prompt components on LLM performance.

### Experimental Design
- Role Instruction (0/1)
- Chain-of-Thought (0/1)
- Few-shot Examples (0/1)
- Output Constraint (0/1)

Factorial within-subject design using GSM8K benchmark.

### Key Findings
- CoT significantly improves accuracy.
- Role instruction reduces performance.
- Output constraint reduces token and latency cost.
- No strong interaction detected.

Optimal Policy: Chain-of-Thought + Output Constraint.
";
