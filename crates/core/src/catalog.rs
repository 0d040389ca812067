//! Built-in specializations, modules, and default question sets.
//!
//! This is the seed content the portal ships with. A persisted override set
//! for a module always shadows the defaults here; resolution happens in the
//! services layer.

use std::fmt;
use std::str::FromStr;

use crate::model::{Question, QuestionId};

//
// ─── FILIERES ──────────────────────────────────────────────────────────────────
//

/// A top-level study track grouping several modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filiere {
    DeveloppementDigital,
    Gestion,
    SystemesReseaux,
}

impl Filiere {
    /// All tracks, in presentation order.
    pub const ALL: [Filiere; 3] = [
        Filiere::DeveloppementDigital,
        Filiere::Gestion,
        Filiere::SystemesReseaux,
    ];

    /// Human-facing label, as shown in the portal.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Filiere::DeveloppementDigital => "Développement Digital",
            Filiere::Gestion => "Gestion",
            Filiere::SystemesReseaux => "Systèmes et Réseaux",
        }
    }

    /// Modules belonging to this track, in presentation order.
    #[must_use]
    pub fn modules(&self) -> &'static [&'static str] {
        match self {
            Filiere::DeveloppementDigital => &["HTML/CSS", "JavaScript", "Python", "React.js"],
            Filiere::Gestion => &["Comptabilité", "Marketing", "Économie"],
            Filiere::SystemesReseaux => &["Cisco CCNA", "Linux Administration", "Sécurité"],
        }
    }
}

impl fmt::Display for Filiere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error type for parsing a `Filiere` from its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFiliereError {
    raw: String,
}

impl fmt::Display for ParseFiliereError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filiere: {}", self.raw)
    }
}

impl std::error::Error for ParseFiliereError {}

impl FromStr for Filiere {
    type Err = ParseFiliereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filiere::ALL
            .into_iter()
            .find(|filiere| filiere.label() == s)
            .ok_or_else(|| ParseFiliereError { raw: s.to_owned() })
    }
}

/// The track a module belongs to, if it is a built-in module.
#[must_use]
pub fn filiere_of(module: &str) -> Option<Filiere> {
    Filiere::ALL
        .into_iter()
        .find(|filiere| filiere.modules().contains(&module))
}

//
// ─── BUILT-IN QUESTION SETS ────────────────────────────────────────────────────
//

fn question(id: u64, text: &str, options: &[&str], correct: &str) -> Question {
    Question::from_persisted(
        QuestionId::new(id),
        text.to_owned(),
        options.iter().map(|s| (*s).to_owned()).collect(),
        correct.to_owned(),
    )
    .expect("built-in question data is valid")
}

/// The default question set shipped for `module`, if any.
///
/// Not every catalog module has questions yet; callers fall back to
/// [`placeholder_set`] for the rest.
///
/// # Panics
///
/// Panics if the built-in data were edited into an invalid shape; the
/// catalog tests guard against that.
#[must_use]
pub fn builtin_questions(module: &str) -> Option<Vec<Question>> {
    match module {
        "HTML/CSS" => Some(vec![
            question(
                1,
                "Que signifie HTML ?",
                &[
                    "HyperText Markup Language",
                    "HyperTech Main Link",
                    "High Text Machine",
                    "Hyperlink Text",
                ],
                "HyperText Markup Language",
            ),
            question(
                2,
                "Quelle propriété change la couleur du texte ?",
                &["font-color", "text-color", "color", "background-color"],
                "color",
            ),
            question(
                3,
                "Quelle balise pour un titre de niveau 1 ?",
                &["<h1>", "<title>", "<head>", "<header>"],
                "<h1>",
            ),
        ]),
        "Python" => Some(vec![
            question(
                1,
                "Comment déclare-t-il une fonction en Python ?",
                &["function name():", "def name():", "void name():", "func name():"],
                "def name():",
            ),
            question(
                2,
                "Quel est le résultat de 3 ** 2 ?",
                &["6", "9", "5", "12"],
                "9",
            ),
            question(
                3,
                "Quelle structure est immuable ?",
                &["List", "Dictionary", "Tuple", "Set"],
                "Tuple",
            ),
        ]),
        "Comptabilité" => Some(vec![
            question(
                1,
                "Quel est le principe de la partie double ?",
                &[
                    "Débit = Crédit",
                    "Actif = Passif",
                    "Ventes = Achats",
                    "Recettes = Dépenses",
                ],
                "Débit = Crédit",
            ),
            question(
                2,
                "Le bilan est un document qui décrit :",
                &["Le résultat", "Le patrimoine", "Les flux de trésorerie", "Les ventes"],
                "Le patrimoine",
            ),
            question(
                3,
                "Un amortissement est :",
                &[
                    "Une entrée d'argent",
                    "Une perte de valeur",
                    "Une dette",
                    "Un gain de capital",
                ],
                "Une perte de valeur",
            ),
        ]),
        "JavaScript" => Some(vec![question(
            1,
            "Comment écrit-on 'Hello World' en alert ?",
            &[
                "msg('Hello')",
                "alert('Hello World')",
                "prompt('Hello')",
                "console.log('Hello')",
            ],
            "alert('Hello World')",
        )]),
        _ => None,
    }
}

/// Degenerate single-question set used when a module has no questions at all.
#[must_use]
pub fn placeholder_set() -> Vec<Question> {
    vec![question(
        0,
        "Chargement des questions pour ce module...",
        &["Option A", "Option B", "Option C", "Option D"],
        "Option A",
    )]
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_filiere_has_modules() {
        for filiere in Filiere::ALL {
            assert!(!filiere.modules().is_empty(), "{filiere} has no modules");
        }
    }

    #[test]
    fn filiere_label_roundtrip() {
        for filiere in Filiere::ALL {
            let parsed: Filiere = filiere.label().parse().unwrap();
            assert_eq!(parsed, filiere);
        }
        assert!("Astrologie".parse::<Filiere>().is_err());
    }

    #[test]
    fn filiere_of_resolves_builtin_modules() {
        assert_eq!(filiere_of("Python"), Some(Filiere::DeveloppementDigital));
        assert_eq!(filiere_of("Marketing"), Some(Filiere::Gestion));
        assert_eq!(filiere_of("Basket"), None);
    }

    #[test]
    fn builtin_sets_are_well_formed() {
        // Exercises the `expect` in `question` for every shipped set.
        for filiere in Filiere::ALL {
            for module in filiere.modules() {
                if let Some(questions) = builtin_questions(module) {
                    assert!(!questions.is_empty());
                    for q in &questions {
                        assert!(q.options().len() >= 2);
                        assert!(q.has_option(q.correct_answer()));
                    }
                }
            }
        }
    }

    #[test]
    fn placeholder_is_a_single_question() {
        let set = placeholder_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].id(), QuestionId::new(0));
    }

    #[test]
    fn modules_without_builtins_return_none() {
        assert!(builtin_questions("React.js").is_none());
        assert!(builtin_questions("Sécurité").is_none());
    }
}
