use crate::error::SchemaError;
use crate::schema::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Name(String),
    Open,
    Close,
    Pipe,
    Star,
    Plus,
    Question,
}

fn tokenize(rule: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = rule.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '?' => {
                chars.next();
                tokens.push(Token::Question);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

/// One term of a content rule before type names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTerm {
    pub names: Vec<String>,
    pub min: usize,
    pub max: Option<usize>,
}

pub(crate) fn parse_rule(rule: &str) -> Result<Vec<RawTerm>, String> {
    let tokens = tokenize(rule)?;
    let mut terms = Vec::new();
    let mut ix = 0usize;
    while ix < tokens.len() {
        let names = match &tokens[ix] {
            Token::Name(name) => {
                ix += 1;
                vec![name.clone()]
            }
            Token::Open => {
                ix += 1;
                let mut names = Vec::new();
                loop {
                    match tokens.get(ix) {
                        Some(Token::Name(name)) => {
                            names.push(name.clone());
                            ix += 1;
                        }
                        _ => return Err("expected a type name inside `(...)`".into()),
                    }
                    match tokens.get(ix) {
                        Some(Token::Pipe) => ix += 1,
                        Some(Token::Close) => {
                            ix += 1;
                            break;
                        }
                        _ => return Err("unterminated `(`".into()),
                    }
                }
                names
            }
            other => return Err(format!("unexpected token {other:?}")),
        };

        let (min, max) = match tokens.get(ix) {
            Some(Token::Star) => {
                ix += 1;
                (0, None)
            }
            Some(Token::Plus) => {
                ix += 1;
                (1, None)
            }
            Some(Token::Question) => {
                ix += 1;
                (0, Some(1))
            }
            _ => (1, Some(1)),
        };
        terms.push(RawTerm { names, min, max });
    }
    Ok(terms)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTerm {
    pub kinds: Vec<NodeKind>,
    pub min: usize,
    pub max: Option<usize>,
}

impl ContentTerm {
    fn accepts(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// A resolved content rule: an ordered list of quantified terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentExpr {
    terms: Vec<ContentTerm>,
}

impl ContentExpr {
    pub(crate) fn resolve(
        node: &'static str,
        rule: &str,
        lookup: impl Fn(&str) -> Option<Vec<NodeKind>>,
    ) -> Result<Self, SchemaError> {
        let raw = parse_rule(rule).map_err(|reason| SchemaError::MalformedContentRule {
            node,
            rule: rule.to_string(),
            reason,
        })?;

        let mut terms = Vec::with_capacity(raw.len());
        for term in raw {
            let mut kinds = Vec::new();
            for name in &term.names {
                let resolved = lookup(name).ok_or_else(|| SchemaError::UnknownContentName {
                    node,
                    name: name.clone(),
                })?;
                for kind in resolved {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
            }
            terms.push(ContentTerm {
                kinds,
                min: term.min,
                max: term.max,
            });
        }
        Ok(Self { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[ContentTerm] {
        &self.terms
    }

    /// Whether `kind` may appear anywhere in content matching this rule.
    pub fn mentions(&self, kind: NodeKind) -> bool {
        self.terms.iter().any(|t| t.accepts(kind))
    }

    pub fn allowed_kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.terms.iter().flat_map(|t| t.kinds.iter().copied())
    }

    pub fn matches(&self, kinds: &[NodeKind]) -> bool {
        fn go(terms: &[ContentTerm], kinds: &[NodeKind]) -> bool {
            let Some((term, rest)) = terms.split_first() else {
                return kinds.is_empty();
            };
            let limit = term.max.unwrap_or(usize::MAX);
            let available = kinds
                .iter()
                .take_while(|k| term.accepts(**k))
                .take(limit)
                .count();
            if available < term.min {
                return false;
            }
            (term.min..=available)
                .rev()
                .any(|taken| go(rest, &kinds[taken..]))
        }
        go(&self.terms, kinds)
    }

    /// The shortest sequence of kinds that satisfies the rule, choosing the
    /// first candidate of each required term that `fillable` accepts.
    pub fn fill(&self, fillable: impl Fn(NodeKind) -> bool) -> Option<Vec<NodeKind>> {
        let mut out = Vec::new();
        for term in &self.terms {
            if term.min == 0 {
                continue;
            }
            let kind = term.kinds.iter().copied().find(|k| fillable(*k))?;
            out.extend(std::iter::repeat_n(kind, term.min));
        }
        Some(out)
    }
}
