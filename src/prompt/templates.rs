pub(super) const ANALYZE: &str = r#"Analyze the tone of the text below. For each dimension choose exactly one label from its allowed list, and score how strongly the text shows it, from 0 to 1.

{% for dimension in dimensions %}- {{ dimension.key }}: one of {{ dimension.labels | join(sep=", ") }}
{% endfor %}
Also list up to 10 short phrases that are characteristic of this voice, and give an overall confidence from 0 to 1.

Respond with JSON only, in exactly this shape:
{"tone": {"label": "...", "score": 0.0}, "language_style": {"label": "...", "score": 0.0}, "formality": {"label": "...", "score": 0.0}, "address_style": {"label": "...", "score": 0.0}, "emotional_appeal": {"label": "...", "score": 0.0}, "key_phrases": ["..."], "confidence": 0.0}

Text:
"""
{{ text }}
"""
"#;

pub(super) const REWRITE: &str = r#"Rewrite the text below so that its voice matches this target tone profile:
{% for dimension in target %}- {{ dimension.key }}: {{ dimension.label }}
{% endfor %}{% if key_phrases %}Phrases typical of this voice: {{ key_phrases | join(sep="; ") }}
{% endif %}
Rules:
- Keep the meaning of every sentence that states a fact, promise or request. Change only the tone.
- Keep roughly the same length as the original.
{% if keywords %}- Keep each of these keywords exactly as written (case does not matter): {% for keyword in keywords %}"{{ keyword }}"{% if not loop.last %}, {% endif %}{% endfor %}
{% endif %}{% if missing %}- Your previous attempt dropped these keywords. Include every one of them this time: {% for keyword in missing %}"{{ keyword }}"{% if not loop.last %}, {% endif %}{% endfor %}
{% endif %}{% if feedback %}
A reviewer scored the previous rewrite and asked for the following:
{% for item in feedback %}- {{ item }}
{% endfor %}{% endif %}
Return only the rewritten text, with no commentary or quotation marks.

Text:
"""
{{ text }}
"""
"#;

pub(super) const FLUENCY: &str = r#"Rate the grammar and fluency of the text below from 0 (unreadable) to 100 (flawless, natural prose). Judge the language only, not the content or tone.

Respond with JSON only: {"fluency": <integer from 0 to 100>}

Text:
"""
{{ text }}
"""
"#;
