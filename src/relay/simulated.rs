//! 模拟后端
//!
//! 不访问网络，按风格从模板中随机挑选一段文本，并加入随机延迟模拟真实耗时。

use std::ops::RangeInclusive;
use std::time::Duration;

use super::client::{BackendError, CallContext, LanguageModelClient, Stage};
use super::style::{self, Style};
use crate::common::truncate_chars;

/// 改写阶段延迟（毫秒）
const REFINE_LATENCY_MS: RangeInclusive<u64> = 100..=400;
/// 生成阶段延迟（毫秒）
const GENERATE_LATENCY_MS: RangeInclusive<u64> = 200..=700;

/// 模拟后端
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    latency: bool,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self { latency: true }
    }

    /// 关闭人工延迟（测试用）
    pub fn without_latency() -> Self {
        Self { latency: false }
    }

    async fn simulate_latency(&self, stage: Stage) {
        if !self.latency {
            return;
        }
        let range = match stage {
            Stage::Refine => REFINE_LATENCY_MS,
            Stage::Generate => GENERATE_LATENCY_MS,
        };
        tokio::time::sleep(Duration::from_millis(fastrand::u64(range))).await;
    }
}

#[async_trait::async_trait]
impl LanguageModelClient for SimulatedBackend {
    async fn invoke(
        &self,
        prompt: &str,
        model: &str,
        context: Option<&CallContext>,
    ) -> Result<String, BackendError> {
        let inferred;
        let ctx = match context {
            Some(ctx) => ctx,
            None => {
                inferred = CallContext::infer(prompt);
                &inferred
            }
        };

        tracing::debug!(
            model,
            stage = ?ctx.stage,
            style = %ctx.style,
            "模拟后端处理请求"
        );

        self.simulate_latency(ctx.stage).await;

        let text = match ctx.stage {
            Stage::Refine => mock_refinement(&ctx.user_input, ctx.style),
            Stage::Generate => mock_answer(&generation_subject(prompt), ctx.style),
        };
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// 生成阶段回显的内容：直答 prompt 去掉风格前缀，其余（改写结果）原样回显
fn generation_subject(prompt: &str) -> String {
    match style::parse_direct_prompt(prompt) {
        Some((_, user_input)) => user_input,
        None => prompt.to_string(),
    }
}

/// 随机选一个模板
fn pick(candidates: Vec<String>) -> String {
    let idx = fastrand::usize(..candidates.len());
    candidates.into_iter().nth(idx).unwrap_or_default()
}

/// 生成改写结果：风格句式 + 原始输入 + 补充要求
pub fn mock_refinement(user_input: &str, style: Style) -> String {
    let instruction = style.rewrite_instruction();
    pick(vec![
        format!(
            "{instruction} of {user_input}, including key concepts, practical applications, \
             and relevant examples. Structure your response appropriately for the requested \
             tone and ensure technical accuracy while maintaining accessibility."
        ),
        format!(
            "{instruction} about {user_input}. Cover the fundamental principles, current \
             developments, and practical implications. Use appropriate language and depth for \
             the requested style."
        ),
        format!(
            "{instruction} regarding {user_input}. Include background context, core mechanisms, \
             and real-world applications. Ensure the explanation matches the requested tone and \
             complexity level."
        ),
    ])
}

/// 生成最终回答：按风格选模板，回显截断后的输入
pub fn mock_answer(subject: &str, style: Style) -> String {
    let echo = |n: usize| truncate_chars(subject, n);

    let candidates = match style {
        Style::Concise => vec![
            format!(
                "Here's a concise overview:\n\n{}...\n\nKey points:\n\
                 • Core functionality and purpose\n\
                 • Main benefits and applications\n\
                 • Current status and adoption\n\n\
                 An important development with practical applications across many industries.",
                echo(80)
            ),
            format!(
                "Brief summary:\n\n{}...\n\nEssentials:\n\
                 - Primary mechanisms\n\
                 - Key advantages\n\
                 - Common use cases\n\n\
                 Significant impact on modern technology and business practice.",
                echo(70)
            ),
        ],
        Style::Detailed => vec![
            format!(
                "Comprehensive Analysis:\n\n{}...\n\n\
                 Detailed Overview:\nThe topic spans several interconnected systems and methods \
                 that have evolved considerably in recent years.\n\n\
                 Core Components:\n\
                 1. Primary processing mechanisms and how they are optimised\n\
                 2. Integration frameworks and compatibility concerns\n\
                 3. Performance metrics and scalability factors\n\
                 4. Security protocols and data protection\n\n\
                 Practical Applications:\nHealthcare, finance, manufacturing and \
                 telecommunications all use it, each with its own constraints.\n\n\
                 Future Developments:\nResearch focuses on efficiency, lower cost and broader \
                 capability.\n\n\
                 Conclusion:\nA transformative approach with far-reaching implications for \
                 complex problem-solving.",
                echo(100)
            ),
            format!(
                "In-Depth Examination:\n\n{}...\n\n\
                 Foundational Principles:\nThe underlying ideas rest on established engineering \
                 principles, extended by modern computational capability.\n\n\
                 Technical Architecture:\n\
                 • Processing algorithms tuned for performance\n\
                 • Data management built for reliability and scale\n\
                 • Security frameworks covering common threat vectors\n\
                 • Interfaces designed for accessibility\n\n\
                 Implementation Considerations:\nSuccessful rollout needs planning, stakeholder \
                 buy-in and a phased deployment.\n\n\
                 Long-term Outlook:\nContinued refinement is expected as adjacent technologies \
                 mature.",
                echo(120)
            ),
        ],
        Style::Casual => vec![
            format!(
                "Hey! So you're asking about this - let me break it down:\n\n{}...\n\n\
                 Basically, think of it as a clever way to solve a real problem faster than the \
                 old approach.\n\n\
                 What makes it interesting:\n\
                 • It's not as complicated as it sounds\n\
                 • People use it for all sorts of practical stuff\n\
                 • The results are pretty impressive when done right\n\n\
                 Bottom line? It's quietly making a big difference, and it keeps getting better!",
                echo(90)
            ),
            format!(
                "Great question! This is a really fun area:\n\n{}...\n\n\
                 Here's the deal - imagine a problem that's bugged people for ages, and someone \
                 finally finds a neat way around it. That's what we're looking at.\n\n\
                 Why it's cool:\n\
                 - It makes complex stuff manageable\n\
                 - Real people see real benefits\n\
                 - It actually works outside the lab\n\n\
                 Watching different industries run with it is half the fun!",
                echo(85)
            ),
        ],
        Style::Professional => vec![
            format!(
                "Executive Summary:\n\n{}...\n\n\
                 Strategic Overview:\nThis capability offers measurable gains in efficiency, \
                 cost-effectiveness and competitive positioning.\n\n\
                 Business Impact:\n\
                 • Streamlined operations with reduced overhead\n\
                 • Stronger data-driven decision-making\n\
                 • Improved customer satisfaction and retention\n\
                 • Sustained competitive advantage\n\n\
                 Recommendations:\nConduct a feasibility assessment, define an implementation \
                 roadmap and establish clear success metrics with executive sponsorship.",
                echo(100)
            ),
            format!(
                "Business Analysis:\n\n{}...\n\n\
                 Market Position:\nMarket dynamics indicate strong growth and increasing \
                 enterprise adoption.\n\n\
                 Value Proposition:\n\
                 - Quantifiable improvement in key performance indicators\n\
                 - Reduced operational complexity and cost\n\
                 - Enhanced scalability\n\
                 - Stronger compliance and risk management\n\n\
                 Strategic Considerations:\nEvaluate alignment with organisational objectives, \
                 total cost of ownership and change-management needs.",
                echo(110)
            ),
        ],
        Style::Educational => vec![
            format!(
                "Learning Guide:\n\n{}...\n\n\
                 Let's build understanding step by step.\n\n\
                 📚 Fundamental Concepts:\nLike learning to drive, you first need to know the \
                 parts before operating the whole system.\n\n\
                 🔍 How It Works (Analogy):\nPicture a huge library where an assistant files and \
                 retrieves every book for you based on what you need.\n\n\
                 💡 Real-World Examples:\n\
                 • Everyday applications you may already use\n\
                 • Industry-specific implementations\n\
                 • Emerging use cases\n\n\
                 🎯 Key Takeaways:\n\
                 - Start with the basic principles\n\
                 - See how they apply in practice\n\
                 - Recognise the broader implications",
                echo(95)
            ),
            format!(
                "Educational Overview:\n\n{}...\n\n\
                 🎓 Learning Objectives:\nBy the end you'll know the what, why and how, and be \
                 able to spot practical applications.\n\n\
                 🔧 Core Mechanisms (Simplified):\n\
                 1. Input Processing: how information enters the system\n\
                 2. Analysis Phase: what happens to it\n\
                 3. Output Generation: how results are produced\n\n\
                 ✅ Self-Check Questions:\n\
                 - Can you explain the main idea in your own words?\n\
                 - What problem does it solve?\n\
                 - Where could you use it?\n\n\
                 🚀 Further Exploration:\nDig into related advanced topics next.",
                echo(105)
            ),
        ],
        Style::Balanced => vec![
            format!(
                "Balanced Overview:\n\n{}...\n\n\
                 This topic balances innovation with practical application, using accessible \
                 approaches to real-world challenges.\n\n\
                 Key Aspects:\n\
                 • Technical foundation built on proven principles\n\
                 • Practical applications across domains\n\
                 • Ongoing development and refinement\n\
                 • Growing adoption\n\n\
                 Looking Forward:\nExpect steady improvement in performance, accessibility and \
                 integration.",
                echo(100)
            ),
            format!(
                "Comprehensive Summary:\n\n{}...\n\n\
                 The area combines theory with practical implementation, giving both immediate \
                 benefits and long-term potential.\n\n\
                 Core Elements:\n\
                 - Established methodologies with a proven track record\n\
                 - Applications addressing current challenges\n\
                 - Solutions that scale to different organisation sizes\n\
                 - Integration with existing systems\n\n\
                 Future Outlook:\nSustained growth and continued relevance are expected.",
                echo(90)
            ),
        ],
    };

    pick(candidates)
}
