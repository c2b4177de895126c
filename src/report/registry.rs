//! Slot registry.
//!
//! One value carries the whole report vocabulary: the keyword priority list
//! used by the classifier, the requirement tables used by the validator and
//! the section list used by the layout engine. Components receive the same
//! `SlotRegistry` by reference, so they cannot drift apart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::{ReportError, SlotMapping};

/// Version of the standard registry. Bump whenever keywords, sections or
/// requirement tables change.
pub const REGISTRY_VERSION: u32 = 2;

/// Separator used when an alternative group is rendered for humans.
pub const ALTERNATIVE_SEPARATOR: &str = " ou ";

/// Logical report field a photo can fill.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Rack,
    LocalAp,
    Panoramica,
    AreaAutoatendimento,
    Equipamento,
    MacSerial,
    Mac,
    Serial,
    TesteVelocidade,
    TelaConexao,
    TesteMtu,
    PortalLogin,
    PortalLoginDepois,
    Checklist,
    Rat,
}

impl Slot {
    pub const ALL: [Slot; 15] = [
        Slot::Rack,
        Slot::LocalAp,
        Slot::Panoramica,
        Slot::AreaAutoatendimento,
        Slot::Equipamento,
        Slot::MacSerial,
        Slot::Mac,
        Slot::Serial,
        Slot::TesteVelocidade,
        Slot::TelaConexao,
        Slot::TesteMtu,
        Slot::PortalLogin,
        Slot::PortalLoginDepois,
        Slot::Checklist,
        Slot::Rat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Rack => "rack",
            Slot::LocalAp => "local_ap",
            Slot::Panoramica => "panoramica",
            Slot::AreaAutoatendimento => "area_autoatendimento",
            Slot::Equipamento => "equipamento",
            Slot::MacSerial => "mac_serial",
            Slot::Mac => "mac",
            Slot::Serial => "serial",
            Slot::TesteVelocidade => "teste_velocidade",
            Slot::TelaConexao => "tela_conexao",
            Slot::TesteMtu => "teste_mtu",
            Slot::PortalLogin => "portal_login",
            Slot::PortalLoginDepois => "portal_login_depois",
            Slot::Checklist => "checklist",
            Slot::Rat => "rat",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of visit the checklist documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistType {
    /// Full installation.
    #[default]
    Produtiva,
    /// Partial or non-productive visit.
    Improdutiva,
}

impl ChecklistType {
    pub const ALL: [ChecklistType; 2] = [ChecklistType::Produtiva, ChecklistType::Improdutiva];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistType::Produtiva => "produtiva",
            ChecklistType::Improdutiva => "improdutiva",
        }
    }
}

impl fmt::Display for ChecklistType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecklistType {
    type Err = ReportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "produtiva" => Ok(ChecklistType::Produtiva),
            "improdutiva" => Ok(ChecklistType::Improdutiva),
            _ => Err(ReportError::InvalidChecklistType(raw.to_string())),
        }
    }
}

/// A mandatory slot, or a group of slots where any one satisfies the rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementRule {
    Required(Slot),
    AnyOf(&'static [Slot]),
}

impl RequirementRule {
    pub fn slots(&self) -> &[Slot] {
        match self {
            RequirementRule::Required(slot) => std::slice::from_ref(slot),
            RequirementRule::AnyOf(slots) => slots,
        }
    }

    pub fn is_satisfied_by(&self, mapping: &SlotMapping) -> bool {
        self.slots().iter().any(|slot| mapping.contains(*slot))
    }

    /// Human readable form: the slot name, or alternatives joined with " ou ".
    pub fn label(&self) -> String {
        self.slots()
            .iter()
            .map(Slot::as_str)
            .collect::<Vec<_>>()
            .join(ALTERNATIVE_SEPARATOR)
    }
}

/// One visual block of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub label: &'static str,
    pub slots: &'static [Slot],
}

/// Keyword fragments per slot, in classification priority order.
const STANDARD_KEYWORDS: &[(Slot, &[&str])] = &[
    (Slot::Rack, &["rack"]),
    (Slot::LocalAp, &["local", "ap_instalado", "apficou", "onde_ap"]),
    (
        Slot::Panoramica,
        &["panoramica", "panorâmica", "panoramico", "panoram"],
    ),
    (
        Slot::AreaAutoatendimento,
        &["autoatendimento", "auto_atendimento", "autoatend"],
    ),
    (Slot::Equipamento, &["equipamento", "device", "equip"]),
    (Slot::MacSerial, &["mac_serial", "macserial"]),
    (Slot::Mac, &["mac"]),
    (Slot::Serial, &["serial"]),
    (
        Slot::TesteVelocidade,
        &["speedtest", "velocidade", "teste_link", "teste_velocidade"],
    ),
    (
        Slot::TelaConexao,
        &["tela_conexao", "tela_conexão", "telawifi", "tela_conexao_wifi"],
    ),
    (Slot::TesteMtu, &["mtu", "banda", "teste_mtu"]),
    (
        Slot::PortalLoginDepois,
        &[
            "portal_login_depois",
            "portal_depois",
            "portal_apos",
            "portal_após",
            "captive_depois",
            "captive_apos",
            "login_depois",
            "login_apos",
        ],
    ),
    (
        Slot::PortalLogin,
        &["portal", "captive", "captcha", "captivo", "portal_login"],
    ),
    (Slot::Checklist, &["checklist"]),
    (Slot::Rat, &["rat"]),
];

/// Immutable slot vocabulary shared by classifier, validator and layout.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    version: u32,
    keywords: Vec<(Slot, &'static [&'static str])>,
    sections: Vec<SectionEntry>,
    produtiva: Vec<RequirementRule>,
    improdutiva: Vec<RequirementRule>,
}

impl SlotRegistry {
    /// The CEF Wi-Fi registry. Keywords are ordered most specific first:
    /// `mac_serial` is checked before `mac` and `serial`, and
    /// `portal_login_depois` before the generic `portal_login`.
    pub fn standard() -> Self {
        let sections = vec![
            SectionEntry { label: "RACK", slots: &[Slot::Rack] },
            SectionEntry { label: "LOCAL ONDE O AP FICOU INSTALADO", slots: &[Slot::LocalAp] },
            SectionEntry { label: "FOTO PANORÂMICA DA SALA", slots: &[Slot::Panoramica] },
            SectionEntry { label: "ÁREA DE AUTOATENDIMENTO", slots: &[Slot::AreaAutoatendimento] },
            SectionEntry { label: "EQUIPAMENTO", slots: &[Slot::Equipamento] },
            SectionEntry { label: "MAC / SERIAL DO EQUIPAMENTO", slots: &[Slot::MacSerial] },
            SectionEntry { label: "MAC (separado)", slots: &[Slot::Mac] },
            SectionEntry { label: "SERIAL (separado)", slots: &[Slot::Serial] },
            SectionEntry { label: "PRINT TESTE DO LINK (SpeedTest)", slots: &[Slot::TesteVelocidade] },
            SectionEntry {
                label: "PRINT DA TELA DE CONEXÃO WIFI (CLIENTES_CAIXA)",
                slots: &[Slot::TelaConexao],
            },
            SectionEntry {
                label: "PRINT DO TESTE WI-FI BANDA E MTU 1500 BYTES",
                slots: &[Slot::TesteMtu],
            },
            SectionEntry {
                label: "PRINTS TELA LOGIN CAPTIVE PORTAL (ANTES/APÓS)",
                slots: &[Slot::PortalLogin, Slot::PortalLoginDepois],
            },
            SectionEntry { label: "CHECKLIST PREENCHIDO ASSINADO", slots: &[Slot::Checklist] },
            SectionEntry { label: "RAT PREENCHIDA ASSINADA", slots: &[Slot::Rat] },
        ];

        let produtiva = vec![
            RequirementRule::Required(Slot::Rack),
            RequirementRule::Required(Slot::LocalAp),
            RequirementRule::Required(Slot::Panoramica),
            RequirementRule::Required(Slot::AreaAutoatendimento),
            RequirementRule::Required(Slot::Equipamento),
            RequirementRule::AnyOf(&[Slot::MacSerial, Slot::Mac]),
            RequirementRule::Required(Slot::TesteVelocidade),
            RequirementRule::Required(Slot::TelaConexao),
            RequirementRule::Required(Slot::TesteMtu),
            RequirementRule::AnyOf(&[Slot::PortalLogin, Slot::PortalLoginDepois]),
            RequirementRule::Required(Slot::Checklist),
            RequirementRule::Required(Slot::Rat),
        ];

        let improdutiva = vec![
            RequirementRule::Required(Slot::Rack),
            RequirementRule::Required(Slot::LocalAp),
            RequirementRule::Required(Slot::AreaAutoatendimento),
            RequirementRule::Required(Slot::Equipamento),
            RequirementRule::AnyOf(&[Slot::MacSerial, Slot::Mac, Slot::Serial]),
            RequirementRule::Required(Slot::TesteVelocidade),
            RequirementRule::Required(Slot::Checklist),
            RequirementRule::Required(Slot::Rat),
        ];

        Self {
            version: REGISTRY_VERSION,
            keywords: STANDARD_KEYWORDS.to_vec(),
            sections,
            produtiva,
            improdutiva,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Keyword table in classification priority order.
    pub fn keywords(&self) -> &[(Slot, &'static [&'static str])] {
        &self.keywords
    }

    /// Section entries in presentation order.
    pub fn sections(&self) -> &[SectionEntry] {
        &self.sections
    }

    pub fn requirements(&self, checklist_type: ChecklistType) -> &[RequirementRule] {
        match checklist_type {
            ChecklistType::Produtiva => &self.produtiva,
            ChecklistType::Improdutiva => &self.improdutiva,
        }
    }

    /// Every slot rendered by the layout, in presentation order.
    pub fn section_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.sections
            .iter()
            .flat_map(|section| section.slots.iter().copied())
    }

    pub fn keywords_for(&self, slot: Slot) -> &[&'static str] {
        self.keywords
            .iter()
            .find(|(candidate, _)| *candidate == slot)
            .map(|(_, keywords)| *keywords)
            .unwrap_or(&[])
    }

    /// Verify that the three views agree on the slot vocabulary: every slot
    /// is classifiable exactly once, rendered in exactly one section, and every
    /// requirement refers to classifiable slots.
    pub fn check_consistency(&self) -> Result<(), ReportError> {
        let mut classifiable = BTreeSet::new();
        for (slot, keywords) in &self.keywords {
            if keywords.is_empty() {
                return Err(ReportError::InconsistentRegistry(format!(
                    "slot '{}' has no keywords",
                    slot
                )));
            }
            if !classifiable.insert(*slot) {
                return Err(ReportError::InconsistentRegistry(format!(
                    "slot '{}' listed twice in keyword table",
                    slot
                )));
            }
        }

        let mut rendered = BTreeSet::new();
        for section in &self.sections {
            if section.slots.is_empty() {
                return Err(ReportError::InconsistentRegistry(format!(
                    "section '{}' has no slots",
                    section.label
                )));
            }
            for slot in section.slots {
                if !rendered.insert(*slot) {
                    return Err(ReportError::InconsistentRegistry(format!(
                        "slot '{}' rendered by more than one section",
                        slot
                    )));
                }
            }
        }

        if classifiable != rendered {
            let diff: Vec<String> = classifiable
                .symmetric_difference(&rendered)
                .map(|slot| slot.to_string())
                .collect();
            return Err(ReportError::InconsistentRegistry(format!(
                "classified and rendered slots differ: {}",
                diff.join(", ")
            )));
        }

        for checklist_type in ChecklistType::ALL {
            for rule in self.requirements(checklist_type) {
                if rule.slots().is_empty() {
                    return Err(ReportError::InconsistentRegistry(format!(
                        "empty alternative group in '{}' table",
                        checklist_type
                    )));
                }
                if let Some(slot) = rule.slots().iter().find(|slot| !classifiable.contains(*slot)) {
                    return Err(ReportError::InconsistentRegistry(format!(
                        "'{}' requires unclassifiable slot '{}'",
                        checklist_type, slot
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
