//! Hierarchical command registry.
//!
//! Nodes live in an arena owned by [`CommandTree`]; children are referenced by
//! [`NodeId`] and each node keeps a non-owning parent index. The tree is built
//! once at startup and never changes afterwards.

use crate::error::{FlagError, RegistryError};
use crate::invocation::Invocation;
use crate::permission::CommandIdentity;
use crate::signal::Flow;

use super::clap_backend;
use super::flags::{FlagSpec, ParsedFlags};

/// Index of a node inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Command body, run after the lifecycle pipeline with the residual arguments.
pub type Action = fn(&mut Invocation, &[String]) -> Flow;

/// Declaration of one command node.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub about: &'static str,
    pub flags: Vec<FlagSpec>,
    pub action: Option<Action>,
    /// Run the lifecycle pipeline before the action.
    pub needs_pipeline: bool,
    /// Activate the remote storage client during the pipeline.
    pub needs_client: bool,
}

impl CommandSpec {
    pub fn new(name: &'static str, about: &'static str) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            about,
            flags: Vec::new(),
            action: None,
            needs_pipeline: true,
            needs_client: false,
        }
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn flags(mut self, flags: impl IntoIterator<Item = FlagSpec>) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Needs the remote storage client (implies the pipeline).
    pub fn client(mut self) -> Self {
        self.needs_client = true;
        self.needs_pipeline = true;
        self
    }

    pub fn without_pipeline(mut self) -> Self {
        self.needs_pipeline = false;
        self.needs_client = false;
        self
    }

    fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.contains(&token)
    }
}

#[derive(Debug, Clone)]
pub struct CommandNode {
    pub spec: CommandSpec,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl CommandNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Result of resolving argv against the tree.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub node: NodeId,
    pub flags: ParsedFlags,
    /// Positional arguments left for the action.
    pub args: Vec<String>,
}

/// Command registry capability used by the lifecycle and runner.
///
/// Implementations may use any argument-parsing library; callers only see
/// node ids, parsed flags, and rendered text.
pub trait CommandRegistry {
    fn register(&mut self, parent: NodeId, spec: CommandSpec) -> Result<NodeId, RegistryError>;
    fn resolve(&self, argv: &[String]) -> Result<Resolution, FlagError>;
    fn node(&self, id: NodeId) -> &CommandNode;
    fn identity(&self, id: NodeId) -> CommandIdentity;
    fn render_help(&self, id: NodeId) -> String;
    fn render_usage(&self, id: NodeId) -> String;
}

/// Arena-backed command tree whose flags are parsed with clap.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl CommandTree {
    pub fn new(root: CommandSpec) -> Self {
        Self {
            nodes: vec![CommandNode {
                spec: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Names from the root to `id`, root included.
    pub fn path(&self, id: NodeId) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            names.push(node.spec.name);
            cursor = node.parent;
        }
        names.reverse();
        names
    }

    /// Walk command tokens from the root; returns the deepest match and how
    /// many tokens were consumed.
    pub fn match_command(&self, argv: &[String]) -> (NodeId, usize) {
        let mut current = self.root();
        let mut consumed = 0;
        for token in argv {
            let next = self.nodes[current.0]
                .children
                .iter()
                .copied()
                .find(|child| self.nodes[child.0].spec.answers_to(token));
            match next {
                Some(child) => {
                    current = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        (current, consumed)
    }

    /// Local flags of `id` plus persistent flags of its ancestors; the
    /// nearest declaration of a name wins.
    pub fn visible_flags(&self, id: NodeId) -> Vec<&FlagSpec> {
        let mut seen = Vec::<&'static str>::new();
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            for flag in &node.spec.flags {
                let inherited = current != id;
                if (inherited && !flag.persistent) || seen.contains(&flag.long) {
                    continue;
                }
                seen.push(flag.long);
                out.push(flag);
            }
            cursor = node.parent;
        }
        out
    }

    fn parser_for(&self, id: NodeId) -> clap::Command {
        let node = &self.nodes[id.0];
        let children: Vec<(&str, &str)> = node
            .children
            .iter()
            .map(|child| {
                let spec = &self.nodes[child.0].spec;
                (spec.name, spec.about)
            })
            .collect();
        clap_backend::build_command(
            &node.spec,
            &self.path(id).join(" "),
            &self.visible_flags(id),
            &children,
        )
    }
}

impl CommandRegistry for CommandTree {
    fn register(&mut self, parent: NodeId, spec: CommandSpec) -> Result<NodeId, RegistryError> {
        let Some(parent_node) = self.nodes.get(parent.0) else {
            return Err(RegistryError::UnknownParent(parent.0));
        };
        let clash = parent_node.children.iter().any(|child| {
            let sibling = &self.nodes[child.0].spec;
            std::iter::once(spec.name)
                .chain(spec.aliases.iter().copied())
                .any(|token| sibling.answers_to(token))
        });
        if clash {
            let mut path = self.path(parent);
            path.push(spec.name);
            return Err(RegistryError::DuplicateCommand(path.join(" ")));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(CommandNode {
            spec,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn resolve(&self, argv: &[String]) -> Result<Resolution, FlagError> {
        let (node, consumed) = self.match_command(argv);
        let (flags, args) =
            clap_backend::parse(self.parser_for(node), &self.visible_flags(node), &argv[consumed..])?;
        Ok(Resolution { node, flags, args })
    }

    fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    fn identity(&self, id: NodeId) -> CommandIdentity {
        CommandIdentity::from_path(&self.path(id)[1..])
    }

    fn render_help(&self, id: NodeId) -> String {
        clap_backend::render_help(self.parser_for(id))
    }

    fn render_usage(&self, id: NodeId) -> String {
        clap_backend::render_usage(self.parser_for(id))
    }
}
