// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由前缀树
//!
//! 每个 HTTP 方法拥有一棵独立的前缀树，树中每个节点对应路由模式的一个分段。
//! 分段分三类：
//! - 字面量，例如 `user`；
//! - 命名参数，以 `:` 开头，匹配恰好一个分段；
//! - 通配符，以 `*` 开头，吞掉剩余的全部分段，只应出现在模式末尾。
//!
//! 节点只记录结构与完整模式字符串，处理器存放在 [`crate::router::Router`] 中，
//! 两者之间仅通过模式字符串关联。

/// 按 `/` 切分路由模式或请求路径。
///
/// 空分段被丢弃，因此连续的 `/` 会被折叠。遇到第一个以 `*` 开头的分段后立即停止，
/// 其后的内容既不返回也不校验。
pub fn parse_pattern(pattern: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for item in pattern.split('/').filter(|item| !item.is_empty()) {
        parts.push(item.to_string());
        if item.starts_with('*') {
            break;
        }
    }
    parts
}

/// 前缀树节点
#[derive(Debug, Default, Clone)]
pub struct Node {
    /// 完整的注册模式，只有真正的路由终点才非空
    pattern: String,
    /// 当前节点对应的分段
    part: String,
    /// 子节点按创建顺序排列，创建后不会删除或重排
    children: Vec<Node>,
    /// 分段以 `:` 或 `*` 开头时为真
    is_wild: bool,
}

impl Node {
    pub fn new(part: &str) -> Self {
        Self {
            pattern: String::new(),
            part: part.to_string(),
            children: Vec::new(),
            is_wild: part.starts_with(':') || part.starts_with('*'),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn is_wild(&self) -> bool {
        self.is_wild
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// 插入时使用：第一个字面量相等或为通配的子节点
    fn match_child(&self, part: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.part == part || child.is_wild)
    }

    /// 将 `parts[height..]` 插入以当前节点为根的子树，并在终点记录 `pattern`。
    ///
    /// 同一分段序列的重复注册会覆盖先前的 `pattern`（后写者胜）。
    pub fn insert(&mut self, pattern: &str, parts: &[String], height: usize) {
        if parts.len() == height {
            self.pattern = pattern.to_string();
            return;
        }

        let part = &parts[height];
        let index = match self.match_child(part) {
            Some(index) => index,
            None => {
                self.children.push(Node::new(part));
                self.children.len() - 1
            }
        };
        self.children[index].insert(pattern, parts, height + 1);
    }

    /// 深度优先、从左到右地查找第一个已注册的终点。
    ///
    /// 到达路径末尾或通配符节点即为终点；结构上可达但未注册的节点不算命中。
    pub fn search(&self, parts: &[String], height: usize) -> Option<&Node> {
        if parts.len() == height || self.part.starts_with('*') {
            if self.pattern.is_empty() {
                return None;
            }
            return Some(self);
        }

        let part = &parts[height];
        self.children
            .iter()
            .filter(|child| child.part == *part || child.is_wild)
            .find_map(|child| child.search(parts, height + 1))
    }

    /// 收集子树中所有已注册的终点
    pub fn travel<'a>(&'a self, list: &mut Vec<&'a Node>) {
        if !self.pattern.is_empty() {
            list.push(self);
        }
        for child in &self.children {
            child.travel(list);
        }
    }
}
