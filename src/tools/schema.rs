//! Operation 描述与参数校验
//!
//! OperationDescriptor 一方面渲染成 OpenAI 的 JSON Schema 交给模型，另一方面在派发前
//! 校验模型给出的参数（必填、类型），不按位置盲信模型输出。

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 单个参数的声明；参数一律为必填字符串（日期、时间、id 都以字符串传递）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
}

impl ParamSpec {
    pub fn required_string(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Operation 描述：名称、描述、参数表；进程启动时构建一次，只读共享
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl OperationDescriptor {
    pub fn new(name: &str, description: &str, parameters: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// 渲染为 `{"type":"object","properties":{..},"required":[..]}`
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                json!({ "type": "string", "description": p.description }),
            );
        }
        let required: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// 按声明校验参数；返回第一条违规原因
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        let obj = args
            .as_object()
            .ok_or_else(|| "arguments must be a JSON object".to_string())?;
        for p in &self.parameters {
            match obj.get(&p.name) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required parameter `{}`", p.name));
                }
                Some(v) if !v.is_string() => {
                    return Err(format!("parameter `{}` must be of type string", p.name));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// 模型发起的一次 operation 调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationCall {
    /// 后端分配的调用 id（tool_call_id），用于把结果与调用配对
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

impl OperationCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
