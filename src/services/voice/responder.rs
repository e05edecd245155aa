//! Scripted chat responder.
//!
//! An ordered keyword table: the first rule with a keyword contained in the
//! message supplies the reply. Messages matching no rule get the default
//! template with `{message}` replaced by the message text.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the user's message in the default template.
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Source tag reported with scripted replies.
pub const SCRIPTED_SOURCE: &str = "cultural_heritage_model";

/// One keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Any of these substrings selects the rule.
    pub keywords: Vec<String>,
    /// Reply text.
    pub response: String,
}

impl ResponseRule {
    /// Creates a rule.
    #[must_use]
    pub fn new<I, S>(keywords: I, response: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            response: response.into(),
        }
    }

    /// Returns true if any keyword occurs in `message`.
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && message.contains(k.as_str()))
    }
}

/// Responder configuration (`[chat]` section).
///
/// Omitting `rules` keeps the built-in table; an explicit empty list leaves
/// only the default template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Reply when no rule matches.
    pub default_template: String,
    /// Rules, tried in order.
    pub rules: Vec<ResponseRule>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_template: "关于\"{message}\"这个话题，作为文物保护专业助手，我建议从预防性保护角度考虑。不同材质的文物有不同的保护要求，您希望了解哪个具体方面的保护方法呢？".to_string(),
            rules: default_rules(),
        }
    }
}

fn default_rules() -> Vec<ResponseRule> {
    vec![
        ResponseRule::new(
            ["你好", "您好"],
            "您好！我是文物领域智能语音助手，很高兴为您服务。请问有什么文物保护方面的问题我可以帮您解答吗？",
        ),
        ResponseRule::new(
            ["文物保护", "保护文物"],
            "文物保护是一项系统性工程，包括预防性保护、抢救性保护和修复性保护。我们需要控制环境条件，防止文物受到温湿度、光照、污染等因素的损害。您想了解哪种具体的保护方法呢？",
        ),
        ResponseRule::new(
            ["青铜器"],
            "青铜器保护主要关注防腐蚀。需要控制环境湿度在45%到55%之间，避免氯离子腐蚀，定期检查是否有青铜病。对于已有锈蚀的青铜器，需要通过机械清理、化学稳定化处理等方法进行修复。",
        ),
        ResponseRule::new(
            ["修复", "技术"],
            "文物修复技术包括物理修复如拼接加固，化学修复如脱盐去污，生物修复处理霉菌虫害等。现代还运用激光清洗、三维打印等高科技手段。修复原则是最小干预、可逆性和真实性。",
        ),
        ResponseRule::new(
            ["书画", "古代书画"],
            "古代书画保护要严格控制温湿度，温度18到22摄氏度，相对湿度50%到60%，避免光照直射，使用无酸材料装裱。储存时应平放或卷放，定期检查霉变、虫蛀情况。",
        ),
        ResponseRule::new(
            ["考古", "发掘"],
            "考古发掘中的文物保护包括现场保护，搭建遮阳棚控制湿度，应急加固使用B72等材料，科学提取整体打包或分块提取，临时保存在适宜环境中。每件文物都需要详细记录和摄影。",
        ),
        ResponseRule::new(
            ["石器"],
            "石器文物保护主要防止风化和机械损伤。要控制温湿度变化，避免盐类结晶破坏，定期清理表面污染物。对于脆弱的石器，需要进行预防性加固处理。",
        ),
        ResponseRule::new(
            ["陶瓷"],
            "陶瓷文物修复技术包括清洗去污、拼接粘合、缺失部分的补配等。使用可逆性的粘合剂，补配部分要与原件有明显区别。修复后要做好保护性处理。",
        ),
        ResponseRule::new(
            ["古建筑"],
            "古建筑保护要求不改变文物原状，最大限度保存历史信息。包括结构加固、屋顶防水、白蚁防治、定期监测等。修缮时要使用传统材料和工艺。",
        ),
        ResponseRule::new(
            ["谢谢", "感谢"],
            "不客气！文物保护是我们共同的责任。如果您还有其他关于文物保护的问题，随时可以询问我。让我们一起守护珍贵的文化遗产！",
        ),
    ]
}

/// Ordered-rule responder. First match wins.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::voice::{ChatConfig, ResponseRule, ScriptedResponder};
///
/// let responder = ScriptedResponder::new(ChatConfig {
///     rules: vec![ResponseRule::new(["敦煌"], "敦煌莫高窟始建于十六国时期。")],
///     default_template: "暂无关于{message}的资料。".to_string(),
/// });
///
/// assert_eq!(responder.respond("介绍敦煌"), "敦煌莫高窟始建于十六国时期。");
/// assert_eq!(responder.respond("兵马俑"), "暂无关于兵马俑的资料。");
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedResponder {
    rules: Vec<ResponseRule>,
    default_template: String,
}

impl ScriptedResponder {
    /// Creates a responder from configuration.
    #[must_use]
    pub fn new(config: ChatConfig) -> Self {
        Self {
            rules: config.rules,
            default_template: config.default_template,
        }
    }

    /// Returns the reply for `message`.
    #[must_use]
    pub fn respond(&self, message: &str) -> String {
        self.rules.iter().find(|rule| rule.matches(message)).map_or_else(
            || self.default_template.replace(MESSAGE_PLACEHOLDER, message),
            |rule| rule.response.clone(),
        )
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for ScriptedResponder {
    fn default() -> Self {
        Self::new(ChatConfig::default())
    }
}
