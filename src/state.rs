// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADO COMPARTILHADO DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::types::{Notes, Outline, SourceId, SourceSnippet};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Estágio do pipeline - transições explícitas, sempre para frente.
///
/// Ordem fixa: Pending < Researched < Synthesized < Drafted.
/// Failed é alcançável a partir de qualquer estágio não-terminal.
/// Pattern matching exaustivo força o tratamento de todos os casos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Estado inicial: apenas a pergunta foi semeada
    Pending,
    /// Evidências coletadas e notas extraídas
    Researched,
    /// Outline temático construído
    Synthesized,
    /// Rascunho final escrito - terminal de sucesso
    Drafted,
    /// Terminal de falha
    Failed,
}

impl Stage {
    /// Posição na ordem de progresso (Failed não participa da ordem).
    fn rank(&self) -> Option<u8> {
        match self {
            Stage::Pending => Some(0),
            Stage::Researched => Some(1),
            Stage::Synthesized => Some(2),
            Stage::Drafted => Some(3),
            Stage::Failed => None,
        }
    }

    /// Verifica se o estágio é terminal (Drafted ou Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Drafted | Stage::Failed)
    }

    /// Verifica se uma transição é válida.
    ///
    /// Avançar exatamente um passo, ou cair em Failed a partir de
    /// qualquer estágio não-terminal. Nunca regride.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Stage::Failed {
            return true;
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => to == from + 1,
            _ => false,
        }
    }

    /// Nome legível para logs e relatórios de falha.
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Researched => "researched",
            Stage::Synthesized => "synthesized",
            Stage::Drafted => "drafted",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Estado único e mutável que atravessa o pipeline.
///
/// Propriedade exclusiva do orquestrador durante a vida de uma query:
/// cada estágio é escrito por exatamente um agente e lido pelo seguinte,
/// nenhum agente retém referência após seu estágio completar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// Id único desta execução
    pub execution_id: Uuid,
    /// Pergunta original (imutável após criação)
    pub query: String,
    /// Fontes recuperadas, em ordem de relevância (append-only, Research)
    pub sources: Vec<SourceSnippet>,
    /// Notas de pesquisa: claim-id → claim (escrito uma vez, Research)
    pub notes: Notes,
    /// Outline temático (escrito uma vez, Synthesis)
    pub outline: Outline,
    /// Resposta final formatada (escrito uma vez, Drafting)
    pub draft: Option<String>,
    /// Estágio atual
    pub stage: Stage,
    /// Trilha do workflow: uma entrada por fase concluída
    pub trace: Vec<String>,
}

impl ResearchState {
    /// Semeia o estado com a pergunta do usuário.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            query: query.into(),
            sources: Vec::new(),
            notes: Notes::new(),
            outline: Outline::default(),
            draft: None,
            stage: Stage::Pending,
            trace: Vec::new(),
        }
    }

    /// Avança para o próximo estágio, registrando a fase na trilha.
    ///
    /// # Panics
    /// Em debug, se a transição violar a ordem do pipeline. O orquestrador
    /// só avança após o artefato do estágio estar comprometido no estado.
    pub fn advance_to(&mut self, target: Stage, phase_note: impl Into<String>) {
        debug_assert!(
            self.stage.can_transition_to(target),
            "transição inválida: {} -> {}",
            self.stage,
            target
        );
        self.stage = target;
        self.trace.push(phase_note.into());
    }

    /// Transiciona para Failed, preservando os artefatos parciais.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.trace.push(format!("failed: {}", reason));
        self.stage = Stage::Failed;
    }

    /// Verifica se um id de fonte resolve para uma entrada de `sources`.
    pub fn resolves_source(&self, id: SourceId) -> bool {
        id.0 >= 1 && id.0 <= self.sources.len()
    }

    /// Snippet correspondente a um id de fonte.
    pub fn source(&self, id: SourceId) -> Option<&SourceSnippet> {
        if id.0 == 0 {
            return None;
        }
        self.sources.get(id.0 - 1)
    }
}
