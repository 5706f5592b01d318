//! Fixed node graph of one conversational turn
//!
//! The graph is a static edge table. [`Topology::new`] validates it once at
//! startup; at runtime a [`Walk`] checks every transition against the table
//! and refuses to enter a node twice.

use equisage_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// A processing node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    /// Entry point: session lookup, follow-up judgment, intent classification
    Router,
    /// Fundamentals fetch; gates the fan-out
    FetchScreener,
    /// Fork point of the parallel collectors
    FanOut,
    /// Technical indicators branch
    FetchTechnicals,
    /// Company news branch
    FetchNews,
    /// Market news branch
    FetchMarketNews,
    /// Barrier after the parallel collectors
    Join,
    /// Report synthesis and session persistence
    GenerateReport,
    /// Attachment assembly
    GenerateArtifact,
    /// Follow-up answer from the restored session
    AnswerFollowup,
    /// Canned greeting
    Greeting,
    /// Canned help text
    Help,
    /// Off-topic deflection
    OffTopic,
    /// Terminal
    End,
}

impl Node {
    /// Every node in the graph
    pub const ALL: [Self; 14] = [
        Self::Router,
        Self::FetchScreener,
        Self::FanOut,
        Self::FetchTechnicals,
        Self::FetchNews,
        Self::FetchMarketNews,
        Self::Join,
        Self::GenerateReport,
        Self::GenerateArtifact,
        Self::AnswerFollowup,
        Self::Greeting,
        Self::Help,
        Self::OffTopic,
        Self::End,
    ];

    /// Upper snake case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "ROUTER",
            Self::FetchScreener => "FETCH_SCREENER",
            Self::FanOut => "FAN_OUT",
            Self::FetchTechnicals => "FETCH_TECHNICALS",
            Self::FetchNews => "FETCH_NEWS",
            Self::FetchMarketNews => "FETCH_MARKET_NEWS",
            Self::Join => "JOIN",
            Self::GenerateReport => "GENERATE_REPORT",
            Self::GenerateArtifact => "GENERATE_ARTIFACT",
            Self::AnswerFollowup => "ANSWER_FOLLOWUP",
            Self::Greeting => "GREETING",
            Self::Help => "HELP",
            Self::OffTopic => "OFF_TOPIC",
            Self::End => "END",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The edge table of a turn
pub const EDGES: &[(Node, Node)] = &[
    (Node::Router, Node::FetchScreener),
    (Node::Router, Node::AnswerFollowup),
    (Node::Router, Node::Greeting),
    (Node::Router, Node::Help),
    (Node::Router, Node::OffTopic),
    (Node::FetchScreener, Node::FanOut),
    (Node::FetchScreener, Node::OffTopic),
    (Node::FanOut, Node::FetchTechnicals),
    (Node::FanOut, Node::FetchNews),
    (Node::FanOut, Node::FetchMarketNews),
    (Node::FetchTechnicals, Node::Join),
    (Node::FetchNews, Node::Join),
    (Node::FetchMarketNews, Node::Join),
    (Node::Join, Node::GenerateReport),
    (Node::GenerateReport, Node::GenerateArtifact),
    (Node::GenerateArtifact, Node::End),
    (Node::AnswerFollowup, Node::End),
    (Node::Greeting, Node::End),
    (Node::Help, Node::End),
    (Node::OffTopic, Node::End),
];

/// Validated graph
#[derive(Debug, Clone)]
pub struct Topology {
    successors: BTreeMap<Node, Vec<Node>>,
    predecessors: BTreeMap<Node, Vec<Node>>,
}

impl Topology {
    /// The standard turn graph
    pub fn standard() -> Result<Self> {
        Self::new(EDGES)
    }

    /// Build and validate a graph from an edge table
    ///
    /// Checks that every node is reachable from `ROUTER`, every node other
    /// than `END` reaches `END`, `END` has no outgoing edges, the graph is
    /// acyclic, and the fan-out branches feed exactly the join.
    pub fn new(edges: &[(Node, Node)]) -> Result<Self> {
        let mut successors: BTreeMap<Node, Vec<Node>> = BTreeMap::new();
        let mut predecessors: BTreeMap<Node, Vec<Node>> = BTreeMap::new();

        for &(from, to) in edges {
            let out = successors.entry(from).or_default();
            if out.contains(&to) {
                return Err(invalid(format!("duplicate edge {from} -> {to}")));
            }
            out.push(to);
            predecessors.entry(to).or_default().push(from);
        }

        let topology = Self {
            successors,
            predecessors,
        };
        topology.validate()?;
        Ok(topology)
    }

    fn validate(&self) -> Result<()> {
        if self.predecessors.contains_key(&Node::Router) {
            return Err(invalid("ROUTER must not have incoming edges".to_string()));
        }
        if !self.successors(Node::End).is_empty() {
            return Err(invalid("END must not have outgoing edges".to_string()));
        }

        let reachable = self.reachable_from(Node::Router);
        for node in Node::ALL {
            if !reachable.contains(&node) {
                return Err(invalid(format!("{node} is not reachable from ROUTER")));
            }
        }

        for node in Node::ALL {
            if node != Node::End && !self.reachable_from(node).contains(&Node::End) {
                return Err(invalid(format!("{node} never reaches END")));
            }
        }

        for node in Node::ALL {
            if self.successors(node).iter().any(|&next| self.reachable_from(next).contains(&node)) {
                return Err(invalid(format!("cycle through {node}")));
            }
        }

        let branches = self.successors(Node::FanOut);
        if branches.is_empty() {
            return Err(invalid("FAN_OUT has no branches".to_string()));
        }
        for &branch in branches {
            if self.successors(branch) != [Node::Join] {
                return Err(invalid(format!("fan-out branch {branch} must lead only to JOIN")));
            }
        }
        let mut joined: Vec<Node> = self.predecessors(Node::Join).to_vec();
        let mut forked: Vec<Node> = branches.to_vec();
        joined.sort();
        forked.sort();
        if joined != forked {
            return Err(invalid("JOIN must be fed by exactly the fan-out branches".to_string()));
        }

        Ok(())
    }

    fn reachable_from(&self, start: Node) -> BTreeSet<Node> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in self.successors(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Outgoing edges of a node
    pub fn successors(&self, node: Node) -> &[Node] {
        self.successors.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Incoming edges of a node
    pub fn predecessors(&self, node: Node) -> &[Node] {
        self.predecessors.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Whether `from -> to` is in the table
    pub fn allows(&self, from: Node, to: Node) -> bool {
        self.successors(from).contains(&to)
    }

    /// The parallel branches of the fan-out
    pub fn fan_out_branches(&self) -> &[Node] {
        self.successors(Node::FanOut)
    }

    /// Start a walk at `ROUTER`
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            topology: self,
            current: Node::Router,
            path: vec![Node::Router],
        }
    }
}

fn invalid(message: String) -> Error {
    Error::Configuration(format!("invalid topology: {message}"))
}

/// One pass through the graph
///
/// Every transition is checked against the table; entering a node twice is a
/// contract violation.
#[derive(Debug)]
pub struct Walk<'a> {
    topology: &'a Topology,
    current: Node,
    path: Vec<Node>,
}

impl Walk<'_> {
    /// Node the walk is at
    pub fn current(&self) -> Node {
        self.current
    }

    /// Nodes visited so far, in order (fan-out branches in table order)
    pub fn path(&self) -> &[Node] {
        &self.path
    }

    /// Whether the walk reached `END`
    pub fn is_done(&self) -> bool {
        self.current == Node::End
    }

    fn enter(&mut self, from: Node, to: Node) -> Result<()> {
        if !self.topology.allows(from, to) {
            return Err(Error::contract(format!("transition {from} -> {to} is not in the graph")));
        }
        if self.path.contains(&to) {
            return Err(Error::contract(format!("node {to} visited twice")));
        }
        self.path.push(to);
        Ok(())
    }

    /// Move to `next`
    pub fn advance(&mut self, next: Node) -> Result<()> {
        self.enter(self.current, next)?;
        self.current = next;
        Ok(())
    }

    /// Pass through the fan-out: enter every branch, then stop at the join
    ///
    /// `branches` must be exactly the fan-out's successors.
    pub fn fork(&mut self, branches: &[Node]) -> Result<Node> {
        let mut wanted = branches.to_vec();
        let mut declared = self.topology.successors(self.current).to_vec();
        wanted.sort();
        declared.sort();
        if wanted != declared {
            return Err(Error::contract(format!(
                "fork at {} over {branches:?} does not match the graph",
                self.current
            )));
        }

        let fork_point = self.current;
        let mut join = None;
        for &branch in branches {
            self.enter(fork_point, branch)?;
            match self.topology.successors(branch) {
                [next] if join.is_none() || join == Some(*next) => join = Some(*next),
                _ => {
                    return Err(Error::contract(format!(
                        "branch {branch} does not converge on a single join"
                    )));
                }
            }
        }

        let join = join.ok_or_else(|| Error::contract(format!("{fork_point} has no branches")))?;
        if self.path.contains(&join) {
            return Err(Error::contract(format!("node {join} visited twice")));
        }
        self.path.push(join);
        self.current = join;
        Ok(join)
    }

    /// Consume the walk, returning the visited path
    pub fn into_path(self) -> Vec<Node> {
        self.path
    }
}
