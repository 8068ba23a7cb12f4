//! Operation 注册表
//!
//! 所有日历动作实现 Operation trait（descriptor / execute），由 OperationRegistry 按名注册与查找，
//! OperationExecutor 在调用时校验参数、加超时并输出审计日志。
//! 注册顺序即交给模型的目录顺序。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::OperationDescriptor;

/// Operation trait：声明（名称、描述、参数）与异步执行
///
/// execute 永不返回 Rust 错误：任何失败都以 `{"error": ...}` 的形式作为结果返回，
/// 由模型用自然语言处理。
#[async_trait]
pub trait Operation: Send + Sync {
    /// 注册时调用一次
    fn descriptor(&self) -> OperationDescriptor;

    /// args 已通过 descriptor 校验
    async fn execute(&self, args: &Value) -> Value;
}

/// 注册表：保序的描述列表 + 名称索引
#[derive(Default)]
pub struct OperationRegistry {
    descriptors: Vec<OperationDescriptor>,
    operations: Vec<Arc<dyn Operation>>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册；同名重复注册时替换实现并保留原位置
    pub fn register(&mut self, op: impl Operation + 'static) {
        let descriptor = op.descriptor();
        let op: Arc<dyn Operation> = Arc::new(op);
        match self.index.get(&descriptor.name) {
            Some(&i) => {
                self.descriptors[i] = descriptor;
                self.operations[i] = op;
            }
            None => {
                self.index
                    .insert(descriptor.name.clone(), self.descriptors.len());
                self.descriptors.push(descriptor);
                self.operations.push(op);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<(&OperationDescriptor, Arc<dyn Operation>)> {
        let &i = self.index.get(name)?;
        Some((&self.descriptors[i], self.operations[i].clone()))
    }

    /// 完整目录（按注册顺序）
    pub fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }
}
