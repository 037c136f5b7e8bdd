use serde::Serialize;

use crate::keywords::KeywordSet;

/// 函式瀏覽器中的一個節點。 / One node of the function browser tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogNode {
    pub label: String,
    pub children: Vec<CatalogNode>,
}

impl CatalogNode {
    fn branch(label: &str, children: Vec<CatalogNode>) -> Self {
        Self {
            label: label.to_string(),
            children,
        }
    }

    fn leaves(label: &str, entries: &[&str]) -> Self {
        Self::branch(label, entries.iter().map(|entry| Self::leaf(entry)).collect())
    }

    fn leaf(label: &str) -> Self {
        Self::branch(label, Vec::new())
    }

    pub fn is_entry(&self) -> bool {
        self.children.is_empty()
    }

    /// 深度優先列出所有葉節點及其路徑。 / Depth-first walk over leaf entries with their category path.
    pub fn entries(&self) -> Vec<(Vec<&str>, &str)> {
        let mut found = Vec::new();
        collect(self, &mut Vec::new(), &mut found);
        found
    }
}

fn collect<'a>(
    node: &'a CatalogNode,
    path: &mut Vec<&'a str>,
    found: &mut Vec<(Vec<&'a str>, &'a str)>,
) {
    if node.is_entry() {
        found.push((path.clone(), node.label.as_str()));
        return;
    }
    path.push(node.label.as_str());
    for child in &node.children {
        collect(child, path, found);
    }
    path.pop();
}

/// 建立函式瀏覽器目錄；第一個分類列出目前的關鍵字。 / Builds the browser catalog; the first category lists the active keywords.
pub fn library_catalog(keywords: &KeywordSet) -> Vec<CatalogNode> {
    let keyword_node = CatalogNode::branch(
        "关键字",
        keywords
            .keywords()
            .iter()
            .map(|keyword| CatalogNode::leaf(keyword))
            .collect(),
    );

    let system = CatalogNode::branch(
        "系统函数",
        vec![
            CatalogNode::leaves("控制台", &["控制台输出()", "控制台输入()", "控制台换行()"]),
            CatalogNode::leaves("命令行", &["系统命令行()"]),
            CatalogNode::leaves("文件读写", &["文件写入", "文件读取", "文件追加"]),
            CatalogNode::branch(
                "网络通信",
                vec![
                    CatalogNode::leaves(
                        "HTTP请求",
                        &["HTTP发送请求(主机名, URL, 内容)", "HTTP获取请求(主机名, URL)"],
                    ),
                    CatalogNode::leaves(
                        "套接字操作",
                        &[
                            "解析主机名(主机名)",
                            "创建套接字(协议类型, 套接字类型)",
                            "连接服务器(套接字描述符, IP地址, 端口)",
                            "发送数据(套接字描述符, 数据)",
                            "接收数据(套接字描述符)",
                            "关闭套接字(套接字描述符)",
                        ],
                    ),
                ],
            ),
            CatalogNode::branch(
                "系统函数库",
                vec![
                    CatalogNode::leaves(
                        "进程参数管理",
                        &[
                            "获取当前工作目录()",
                            "切换工作目录(路径)",
                            "获取环境变量值(键, 默认值)",
                            "设置环境变量(键, 值)",
                            "删除环境变量(键)",
                        ],
                    ),
                    CatalogNode::leaves(
                        "文件和目录操作",
                        &[
                            "列出目录内容(路径)",
                            "创建目录(路径)",
                            "递归创建目录(路径)",
                            "删除文件(路径)",
                            "删除目录(路径)",
                            "递归删除目录(路径)",
                            "重命名文件(源路径, 目标路径)",
                            "获取文件状态(路径)",
                            "路径是否存在(路径)",
                            "是否为文件(路径)",
                            "是否为目录(路径)",
                        ],
                    ),
                    CatalogNode::leaves(
                        "路径操作",
                        &[
                            "连接路径(路径1, 路径2)",
                            "获取绝对路径(路径)",
                            "获取文件名(路径)",
                            "获取目录名(路径)",
                            "分割路径(路径)",
                            "分割文件名和扩展名(路径)",
                        ],
                    ),
                    CatalogNode::leaves(
                        "系统命令执行",
                        &["执行系统命令(命令)", "执行命令并获取输出(命令)"],
                    ),
                ],
            ),
            CatalogNode::leaves(
                "字符串",
                &["长度()", "字符转整型()", "转小写()", "整数转字符串()"],
            ),
            CatalogNode::leaves("主函数", &["主函数()"]),
        ],
    );

    let math = CatalogNode::leaves(
        "数学函数库",
        &["幂", "最大值", "最小值", "绝对值", "平方根", "正弦", "余弦", "正切"],
    );

    vec![keyword_node, system, math]
}

/// 雙擊瀏覽器項目時插入的文字。 / Text inserted when a browser entry is activated.
///
/// Only leaf entries insert anything; category labels yield `None`.
pub fn insertion_text(node: &CatalogNode) -> Option<&str> {
    node.is_entry().then_some(node.label.as_str())
}

/// 依標籤尋找節點（深度優先）。 / Finds a node by label, depth first.
pub fn find_node<'a>(catalog: &'a [CatalogNode], label: &str) -> Option<&'a CatalogNode> {
    catalog.iter().find_map(|node| {
        if node.label == label {
            Some(node)
        } else {
            find_node(&node.children, label)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_category_follows_keyword_set() {
        let mut keywords = KeywordSet::new();
        keywords.insert("如果", None::<String>);
        let catalog = library_catalog(&keywords);
        assert_eq!(catalog[0].label, "关键字");
        assert_eq!(catalog[0].children, vec![CatalogNode::leaf("如果")]);
    }

    #[test]
    fn only_entries_insert_text() {
        let catalog = library_catalog(&KeywordSet::builtin());
        let console = find_node(&catalog, "控制台").unwrap();
        assert_eq!(insertion_text(console), None);
        let entry = find_node(&catalog, "控制台输出()").unwrap();
        assert_eq!(insertion_text(entry), Some("控制台输出()"));
    }

    #[test]
    fn entries_carry_their_path() {
        let catalog = library_catalog(&KeywordSet::new());
        let entries = catalog[1].entries();
        let (path, label) = entries
            .iter()
            .find(|(_, label)| *label == "关闭套接字(套接字描述符)")
            .unwrap();
        assert_eq!(path, &vec!["系统函数", "网络通信", "套接字操作"]);
        assert_eq!(*label, "关闭套接字(套接字描述符)");
    }

    #[test]
    fn catalog_entries_have_documentation_or_are_plain_calls() {
        let keywords = KeywordSet::builtin();
        let catalog = library_catalog(&keywords);
        let console = find_node(&catalog, "控制台").unwrap();
        for (_, entry) in console.entries() {
            assert!(keywords.documentation(entry).is_some(), "{entry}");
        }
    }
}
