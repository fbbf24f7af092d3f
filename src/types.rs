// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identificador de fonte: índice 1-based em `ResearchState::sources`.
///
/// É o mesmo número usado nos marcadores de citação `[n]` do rascunho final,
/// o que torna a checagem de integridade referencial trivial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Identificador de claim ("c1", "c2", ...), atribuído na ordem em que o
/// modelo retorna os claims.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    /// Gera o id posicional ("c1" para index 0).
    pub fn from_index(index: usize) -> Self {
        Self(format!("c{}", index + 1))
    }

    /// Texto do id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trecho de evidência retornado pela busca.
///
/// Imutável após inserção em `ResearchState::sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    /// URL da fonte
    pub url: String,
    /// Título da página (quando o provedor fornece)
    pub title: String,
    /// Texto do snippet
    pub text: String,
    /// Momento em que o snippet foi recuperado
    pub retrieved_at: DateTime<Utc>,
}

impl SourceSnippet {
    /// Cria um snippet carimbado com o horário atual.
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text: text.into(),
            retrieved_at: Utc::now(),
        }
    }
}

/// Nível de confiança atribuído a um claim pelo Research Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Suportado por múltiplas fontes concordantes
    High,
    /// Suportado, sem corroboração extra
    #[default]
    Medium,
    /// Suporte fraco ou indireto
    Low,
}

/// Claim atômico extraído das evidências, com atribuição de fontes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Texto do claim
    pub claim: String,
    /// Fontes que suportam o claim (sempre >= 1 após validação)
    pub sources: Vec<SourceId>,
    /// Confiança estimada
    pub confidence: Confidence,
    /// Claims que este contradiz (relação simétrica após normalização)
    pub contradicts: Vec<ClaimId>,
}

/// Mapa de claims indexado por id.
///
/// BTreeMap para iteração determinística: mesmo input, mesma ordem.
pub type Notes = BTreeMap<ClaimId, Note>;

/// Seção temática do outline produzido pelo Synthesis Agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSection {
    /// Nome do tema
    pub theme: String,
    /// Claims agrupados sob o tema, em ordem de relevância
    pub claims: Vec<ClaimId>,
    /// Pares de claims em contradição dentro da seção
    pub contradictions: Vec<(ClaimId, ClaimId)>,
}

impl ThemeSection {
    /// Seção sem contradições.
    pub fn new(theme: impl Into<String>, claims: Vec<ClaimId>) -> Self {
        Self {
            theme: theme.into(),
            claims,
            contradictions: Vec::new(),
        }
    }

    /// Verifica se a seção marca algum par como contraditório.
    pub fn has_contradictions(&self) -> bool {
        !self.contradictions.is_empty()
    }
}

/// Outline completo: temas ordenados por relevância à pergunta original.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    /// Seções temáticas
    pub sections: Vec<ThemeSection>,
}

impl Outline {
    /// Todos os claim-ids referenciados pelo outline.
    pub fn claim_ids(&self) -> impl Iterator<Item = &ClaimId> {
        self.sections.iter().flat_map(|s| s.claims.iter())
    }

    /// Verifica se algum tema contém o claim.
    pub fn contains_claim(&self, id: &ClaimId) -> bool {
        self.claim_ids().any(|c| c == id)
    }
}
