//! Localization
//!
//! [`Localizer`] is a plain value: a set of per-locale message tables plus
//! the active locale. Callers construct one and hand it to whatever needs
//! translated text, so separate verifiers (and tests) never share state.
//!
//! Lookup order for a key: active locale (`pt-br`), its base language
//! (`pt`), English, then the key itself.

use std::collections::HashMap;

use crate::catalog::BackendErrorCode;

pub const DEFAULT_LOCALE: &str = "en";

/// Message keys used by the verification pipeline
pub mod keys {
    pub const SUCCESS: &str = "verification.success";
    pub const WARNING: &str = "verification.warning";
    pub const ERROR: &str = "verification.error";
    pub const CANCELLED: &str = "verification.cancelled";
    pub const INVALID_CODE: &str = "verification.invalid_code";
    pub const NOT_AVAILABLE: &str = "verification.na";
}

pub type MessageTable = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct Localizer {
    locale: String,
    tables: HashMap<String, MessageTable>,
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl Localizer {
    /// Localizer with the built-in tables
    pub fn new(locale: &str) -> Self {
        let tables = BUILTIN
            .iter()
            .map(|(locale, entries)| ((*locale).to_string(), to_table(entries)))
            .collect();
        Self {
            locale: normalize(locale),
            tables,
        }
    }

    /// Localizer with no tables at all; every lookup returns the key
    pub fn empty(locale: &str) -> Self {
        Self {
            locale: normalize(locale),
            tables: HashMap::new(),
        }
    }

    /// Add or override entries for a locale
    pub fn with_table<K, V>(mut self, locale: &str, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let table = self.tables.entry(normalize(locale)).or_default();
        for (key, value) in entries {
            table.insert(key.into(), value.into());
        }
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.locale = normalize(locale);
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.tables.contains_key(&normalize(locale))
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        let base = self.locale.split('-').next().unwrap_or(DEFAULT_LOCALE);
        [self.locale.as_str(), base, DEFAULT_LOCALE]
            .into_iter()
            .find_map(|locale| self.tables.get(locale)?.get(key))
            .map(String::as_str)
    }

    /// Translate `key`, falling back to the key itself
    pub fn t(&self, key: &str) -> String {
        self.lookup(key).unwrap_or(key).to_string()
    }

    /// Translate and substitute `{{name}}` placeholders
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .fold(self.t(key), |message, (name, value)| {
                message.replace(&format!("{{{{{name}}}}}"), value)
            })
    }

    /// Message for a backend error code; unknown codes get the generic
    /// error text
    pub fn error_message(&self, code: i64) -> String {
        match BackendErrorCode::from_code(code) {
            Some(known) => self
                .lookup(&known.key())
                .unwrap_or(known.default_message())
                .to_string(),
            None => self.t(keys::ERROR),
        }
    }
}

fn normalize(locale: &str) -> String {
    let locale = locale.trim().to_ascii_lowercase().replace('_', "-");
    if locale.is_empty() {
        DEFAULT_LOCALE.to_string()
    } else {
        locale
    }
}

fn to_table(entries: &[(&str, &str)]) -> MessageTable {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

type Entries = &'static [(&'static str, &'static str)];

const BUILTIN: [(&str, Entries); 6] = [
    ("en", EN),
    ("es", ES),
    ("pt", PT),
    ("fr", FR),
    ("de", DE),
    ("zh", ZH),
];

const EN: Entries = &[
    (keys::SUCCESS, "This product is authentic and registered with Syngenta."),
    (
        keys::WARNING,
        "Potential counterfeit detected. Please escalate to Syngenta support.",
    ),
    (keys::ERROR, "Verification failed. Please try again."),
    (keys::CANCELLED, "Verification cancelled."),
    (keys::INVALID_CODE, "Not a valid product code."),
    (keys::NOT_AVAILABLE, "N/A"),
    ("error.code.0", "Tracking id is not available."),
    ("error.code.1", "Code scanned multiple times. Contact Syngenta."),
    ("error.code.2", "Tracking id is not available."),
    ("error.code.3", "Tracking ID is not active."),
    ("error.code.4", "Invalid mandatory input values."),
    ("error.code.5", "Missing mandatory input values."),
    ("error.code.6", "Invalid Tracking ID."),
    ("error.code.7", "Tracking ID is blacklisted."),
    ("error.code.8", "Authentication for code has failed."),
    ("error.code.9", "Turkey product with valid format."),
    ("error.code.10", "GTIN does not exist."),
    ("error.code.11", "Serial Number does not exist."),
    ("error.code.12", "Tracking ID is stolen."),
];

const ES: Entries = &[
    (keys::SUCCESS, "Este producto es auténtico y está registrado en Syngenta."),
    (
        keys::WARNING,
        "Posible falsificación detectada. Comuníquese con el soporte de Syngenta.",
    ),
    (keys::ERROR, "La verificación falló. Inténtelo de nuevo."),
    (keys::CANCELLED, "Verificación cancelada."),
    (keys::INVALID_CODE, "No es un código de producto válido."),
    (keys::NOT_AVAILABLE, "No Disponible"),
    ("error.code.0", "El ID de seguimiento no está disponible."),
    ("error.code.1", "Código escaneado varias veces. Contacte a Syngenta."),
    ("error.code.2", "El ID de seguimiento no está disponible."),
    ("error.code.3", "El ID de seguimiento no está activo."),
    ("error.code.4", "Valores de entrada obligatorios no válidos."),
    ("error.code.5", "Faltan valores de entrada obligatorios."),
    ("error.code.6", "ID de seguimiento no válido."),
    ("error.code.7", "El ID de seguimiento está en la lista negra."),
    ("error.code.8", "La autenticación del código ha fallado."),
    ("error.code.9", "Producto de Turquía con formato válido."),
    ("error.code.10", "El GTIN no existe."),
    ("error.code.11", "El número de serie no existe."),
    ("error.code.12", "El ID de seguimiento ha sido robado."),
];

const PT: Entries = &[
    (keys::SUCCESS, "Este produto é autêntico e está registrado na Syngenta."),
    (
        keys::WARNING,
        "Possível falsificação detectada. Entre em contato com o suporte da Syngenta.",
    ),
    (keys::ERROR, "A verificação falhou. Tente novamente."),
    (keys::CANCELLED, "Verificação cancelada."),
    (keys::INVALID_CODE, "Não é um código de produto válido."),
    (keys::NOT_AVAILABLE, "Não Disponível"),
    ("error.code.0", "O ID de rastreamento não está disponível."),
    ("error.code.1", "Código escaneado várias vezes. Contate a Syngenta."),
    ("error.code.2", "O ID de rastreamento não está disponível."),
    ("error.code.3", "O ID de rastreamento não está ativo."),
    ("error.code.4", "Valores de entrada obrigatórios inválidos."),
    ("error.code.5", "Valores de entrada obrigatórios ausentes."),
    ("error.code.6", "ID de rastreamento inválido."),
    ("error.code.7", "O ID de rastreamento está na lista negra."),
    ("error.code.8", "A autenticação do código falhou."),
    ("error.code.9", "Produto da Turquia com formato válido."),
    ("error.code.10", "O GTIN não existe."),
    ("error.code.11", "O número de série não existe."),
    ("error.code.12", "O ID de rastreamento foi roubado."),
];

const FR: Entries = &[
    (keys::SUCCESS, "Ce produit est authentique et enregistré chez Syngenta."),
    (
        keys::WARNING,
        "Contrefaçon potentielle détectée. Veuillez contacter le support Syngenta.",
    ),
    (keys::ERROR, "La vérification a échoué. Veuillez réessayer."),
    (keys::CANCELLED, "Vérification annulée."),
    (keys::INVALID_CODE, "Ce n'est pas un code produit valide."),
    (keys::NOT_AVAILABLE, "Non Disponible"),
    ("error.code.0", "L'identifiant de suivi n'est pas disponible."),
    ("error.code.1", "Code scanné plusieurs fois. Contactez Syngenta."),
    ("error.code.2", "L'identifiant de suivi n'est pas disponible."),
    ("error.code.3", "L'identifiant de suivi n'est pas actif."),
    ("error.code.4", "Valeurs d'entrée obligatoires non valides."),
    ("error.code.5", "Valeurs d'entrée obligatoires manquantes."),
    ("error.code.6", "Identifiant de suivi non valide."),
    ("error.code.7", "L'identifiant de suivi est sur liste noire."),
    ("error.code.8", "L'authentification du code a échoué."),
    ("error.code.9", "Produit turc au format valide."),
    ("error.code.10", "Le GTIN n'existe pas."),
    ("error.code.11", "Le numéro de série n'existe pas."),
    ("error.code.12", "L'identifiant de suivi a été volé."),
];

const DE: Entries = &[
    (keys::SUCCESS, "Dieses Produkt ist authentisch und bei Syngenta registriert."),
    (
        keys::WARNING,
        "Mögliche Fälschung erkannt. Bitte wenden Sie sich an den Syngenta-Support.",
    ),
    (
        keys::ERROR,
        "Die Überprüfung ist fehlgeschlagen. Bitte versuchen Sie es erneut.",
    ),
    (keys::CANCELLED, "Überprüfung abgebrochen."),
    (keys::INVALID_CODE, "Kein gültiger Produktcode."),
    (keys::NOT_AVAILABLE, "Nicht Verfügbar"),
    ("error.code.0", "Tracking-ID ist nicht verfügbar."),
    ("error.code.1", "Code wurde mehrfach gescannt. Wenden Sie sich an Syngenta."),
    ("error.code.2", "Tracking-ID ist nicht verfügbar."),
    ("error.code.3", "Tracking-ID ist nicht aktiv."),
    ("error.code.4", "Ungültige Pflichteingaben."),
    ("error.code.5", "Fehlende Pflichteingaben."),
    ("error.code.6", "Ungültige Tracking-ID."),
    ("error.code.7", "Tracking-ID steht auf der Sperrliste."),
    ("error.code.8", "Authentifizierung des Codes fehlgeschlagen."),
    ("error.code.9", "Türkisches Produkt mit gültigem Format."),
    ("error.code.10", "GTIN existiert nicht."),
    ("error.code.11", "Seriennummer existiert nicht."),
    ("error.code.12", "Tracking-ID wurde gestohlen."),
];

const ZH: Entries = &[
    (keys::SUCCESS, "此产品是正品并已在先正达注册。"),
    (keys::WARNING, "检测到潜在假冒产品。请联系先正达支持部门上报。"),
    (keys::ERROR, "验证失败，请重试。"),
    (keys::CANCELLED, "验证已取消。"),
    (keys::INVALID_CODE, "不是有效的产品代码。"),
    (keys::NOT_AVAILABLE, "不可用"),
    ("error.code.0", "追踪码不可用。"),
    ("error.code.1", "该代码已被多次扫描。请联系先正达。"),
    ("error.code.2", "追踪码不可用。"),
    ("error.code.3", "追踪码未激活。"),
    ("error.code.4", "必填输入值无效。"),
    ("error.code.5", "缺少必填输入值。"),
    ("error.code.6", "无效的追踪码。"),
    ("error.code.7", "追踪码已被列入黑名单。"),
    ("error.code.8", "代码认证失败。"),
    ("error.code.9", "格式有效的土耳其产品。"),
    ("error.code.10", "GTIN 不存在。"),
    ("error.code.11", "序列号不存在。"),
    ("error.code.12", "追踪码已被盗。"),
];
